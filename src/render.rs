use crate::api_client::Site;
use crate::error::AppError;
use crate::models::{DifficultyCount, Ranking, RecentSubmission, StatsRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::f64::consts::PI;
use std::fmt::Write;
use tracing::debug;

pub const CARD_WIDTH: u32 = 500;
pub const CARD_HEIGHT: u32 = 200;
pub const BAR_WIDTH: f64 = 300.0;
pub const RING_RADIUS: f64 = 40.0;
const BAR_SPACING: u32 = 40;
const DEFAULT_THEME: &str = "light";

/// Key of the metadata field excluded from change detection.
pub const GENERATED_AT_KEY: &str = "generatedAt";

pub struct Theme {
    pub card: &'static str,
    pub border: &'static str,
    pub text: &'static str,
    pub text_secondary: &'static str,
    pub progress_bg: &'static str,
    pub easy: &'static str,
    pub medium: &'static str,
    pub hard: &'static str,
    pub accent: &'static str,
}

static THEMES: [(&str, Theme); 3] = [
    (
        "light",
        Theme {
            card: "#ffffff",
            border: "#e1e4e8",
            text: "#24292e",
            text_secondary: "#586069",
            progress_bg: "#f6f8fa",
            easy: "#00af9b",
            medium: "#ffb800",
            hard: "#ff2d55",
            accent: "#ffa116",
        },
    ),
    (
        "dark",
        Theme {
            card: "#0d1117",
            border: "#30363d",
            text: "#c9d1d9",
            text_secondary: "#8b949e",
            progress_bg: "#21262d",
            easy: "#00af9b",
            medium: "#ffb800",
            hard: "#ff2d55",
            accent: "#58a6ff",
        },
    ),
    (
        "nord",
        Theme {
            card: "#2e3440",
            border: "#434c5e",
            text: "#eceff4",
            text_secondary: "#d8dee9",
            progress_bg: "#434c5e",
            easy: "#a3be8c",
            medium: "#ebcb8b",
            hard: "#bf616a",
            accent: "#88c0d0",
        },
    ),
];

/// Looks up a palette by name; unknown names get the light palette.
pub fn theme(name: &str) -> &'static Theme {
    let wanted = name.trim().to_ascii_lowercase();
    let found = THEMES.iter().find(|(key, _)| *key == wanted);
    if found.is_none() {
        debug!(theme = name, fallback = DEFAULT_THEME, "unknown theme");
    }
    found
        .or_else(|| THEMES.iter().find(|(key, _)| *key == DEFAULT_THEME))
        .map(|(_, theme)| theme)
        .unwrap_or(&THEMES[0].1)
}

/// Escapes the five markup-significant characters.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn bar_fill(count: &DifficultyCount) -> f64 {
    (BAR_WIDTH * count.fraction()).clamp(0.0, BAR_WIDTH)
}

pub fn ring_circumference() -> f64 {
    2.0 * PI * RING_RADIUS
}

/// Dash offset of the completion ring: the full circumference at 0%, zero at 100%.
pub fn ring_dash_offset(record: &StatsRecord) -> f64 {
    ring_circumference() * (1.0 - record.ring_fraction())
}

fn ranking_label(ranking: Ranking) -> String {
    match ranking {
        Ranking::Known(rank) => format!("#{}", rank),
        Ranking::Unknown => "N/A".to_string(),
    }
}

/// Renders the stats card. Output depends only on the arguments.
pub fn render(record: &StatsRecord, theme: &Theme, site: Site) -> String {
    let width = CARD_WIDTH;
    let height = CARD_HEIGHT;
    let circumference = ring_circumference();
    let dash_offset = ring_dash_offset(record);
    let username = escape(record.username());
    let heading = escape(record.heading());
    let profile_url = escape(&site.profile_url(record.username()));

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg width="{width}" height="{height}" viewBox="0 0 {width} {height}" fill="none" xmlns="http://www.w3.org/2000/svg" role="img" aria-labelledby="leetcode-stats-title">"#
    );
    let _ = writeln!(
        svg,
        r#"  <title id="leetcode-stats-title">{username} | LeetCode Stats Card</title>"#
    );
    svg.push_str("  <style>\n");
    svg.push_str("    @keyframes fadeIn { from { opacity: 0 } to { opacity: 1 } }\n");
    svg.push_str(
        "    #username-text, #ranking { opacity: 0; animation: fadeIn 0.4s ease 0.15s forwards }\n",
    );
    svg.push_str("    #icon { opacity: 0; animation: fadeIn 0.4s ease 0s forwards }\n");
    svg.push_str("  </style>\n");

    let _ = writeln!(
        svg,
        r#"  <rect x="0.5" y="0.5" rx="4" width="{}" height="{}" fill="{}" stroke="{}" stroke-width="1"/>"#,
        width - 1,
        height - 1,
        theme.card,
        theme.border
    );

    write_icon(&mut svg, theme);

    let _ = writeln!(svg, r#"  <a href="{profile_url}" target="_blank">"#);
    let _ = writeln!(
        svg,
        r#"    <text id="username-text" x="65" y="40" fill="{}" font-size="24" font-weight="bold">{heading}</text>"#,
        theme.text
    );
    svg.push_str("  </a>\n");
    let _ = writeln!(
        svg,
        r#"  <text id="ranking" x="480" y="40" fill="{}" font-size="18" font-weight="bold" text-anchor="end">{}</text>"#,
        theme.text_secondary,
        escape(&ranking_label(record.ranking()))
    );

    svg.push_str("  <g transform=\"translate(30, 85)\">\n");
    let _ = writeln!(
        svg,
        r#"    <circle cx="40" cy="40" r="{RING_RADIUS}" fill="none" stroke="{}" stroke-width="6"/>"#,
        theme.progress_bg
    );
    let _ = writeln!(
        svg,
        r#"    <circle cx="40" cy="40" r="{RING_RADIUS}" fill="none" stroke="{}" stroke-width="6" stroke-dasharray="{circumference:.2}" stroke-dashoffset="{circumference:.2}" transform="rotate(-90 40 40)" stroke-linecap="round">"#,
        theme.accent
    );
    let _ = writeln!(
        svg,
        r#"      <animate attributeName="stroke-dashoffset" from="{circumference:.2}" to="{dash_offset:.2}" dur="0.8s" begin="0.2s" fill="freeze"/>"#
    );
    svg.push_str("    </circle>\n");
    let _ = writeln!(
        svg,
        r#"    <text x="40" y="40" font-size="28" font-weight="bold" fill="{}" text-anchor="middle" dominant-baseline="central">{}</text>"#,
        theme.text,
        record.total_solved()
    );
    svg.push_str("  </g>\n");

    svg.push_str("  <g transform=\"translate(160, 80)\">\n");
    for (index, bucket) in record.buckets().into_iter().enumerate() {
        let color = match index {
            0 => theme.easy,
            1 => theme.medium,
            _ => theme.hard,
        };
        write_bar(&mut svg, theme, color, bucket, index as u32);
    }
    svg.push_str("  </g>\n");
    svg.push_str("</svg>\n");
    svg
}

fn write_bar(svg: &mut String, theme: &Theme, color: &str, bucket: &DifficultyCount, index: u32) {
    let offset = index * BAR_SPACING;
    let begin = 0.35 + 0.2 * f64::from(index);
    let fill = bar_fill(bucket);
    let label = escape(bucket.difficulty().display_name());
    let counts = escape(&format!("{} / {}", bucket.solved(), bucket.total()));

    let _ = writeln!(svg, r#"    <g transform="translate(0, {offset})">"#);
    let _ = writeln!(
        svg,
        r#"      <text x="0" y="0" fill="{}" font-size="18" font-weight="bold">{label}</text>"#,
        theme.text
    );
    let _ = writeln!(
        svg,
        r#"      <text x="{BAR_WIDTH}" y="0" fill="{}" font-size="16" font-weight="bold" text-anchor="end">{counts}</text>"#,
        theme.text_secondary
    );
    let _ = writeln!(
        svg,
        r#"      <line x1="0" y1="10" x2="{BAR_WIDTH}" y2="10" stroke="{}" stroke-width="4" stroke-linecap="round"/>"#,
        theme.progress_bg
    );
    let _ = writeln!(
        svg,
        r#"      <line x1="0" y1="10" x2="{BAR_WIDTH}" y2="10" stroke="{color}" stroke-width="4" stroke-dasharray="0 10000" stroke-linecap="round">"#
    );
    let _ = writeln!(
        svg,
        r#"        <animate attributeName="stroke-dasharray" from="0 10000" to="{fill:.2} 10000" dur="0.6s" begin="{begin:.2}s" fill="freeze"/>"#
    );
    svg.push_str("      </line>\n");
    svg.push_str("    </g>\n");
}

fn write_icon(svg: &mut String, theme: &Theme) {
    svg.push_str("  <g id=\"icon\" transform=\"translate(20, 15) scale(0.27)\">\n");
    let _ = writeln!(
        svg,
        r#"    <g stroke="none" fill="{}" fill-rule="evenodd">"#,
        theme.text
    );
    svg.push_str("      <path d=\"M67.506,83.066 C70.000,80.576 74.037,80.582 76.522,83.080 C79.008,85.578 79.002,89.622 76.508,92.112 L65.435,103.169 C55.219,113.370 38.560,113.518 28.172,103.513 C28.112,103.455 23.486,98.920 8.227,83.957 C-1.924,74.002 -2.936,58.074 6.616,47.846 L24.428,28.774 C33.910,18.621 51.387,17.512 62.227,26.278 L78.405,39.362 C81.144,41.577 81.572,45.598 79.361,48.342 C77.149,51.087 73.135,51.515 70.395,49.300 L54.218,36.217 C48.549,31.632 38.631,32.262 33.739,37.500 L15.927,56.572 C11.277,61.552 11.786,69.574 17.146,74.829 C28.351,85.816 36.987,94.284 36.997,94.294 C42.398,99.495 51.130,99.418 56.433,94.123 L67.506,83.066 Z\" fill=\"#FFA116\"/>\n");
    let _ = writeln!(
        svg,
        r#"      <path d="M49.412,2.023 C51.817,-0.552 55.852,-0.686 58.423,1.722 C60.994,4.132 61.128,8.173 58.723,10.749 L15.928,56.572 C11.277,61.551 11.786,69.573 17.145,74.829 L36.909,94.209 C39.425,96.676 39.468,100.719 37.005,103.240 C34.542,105.760 30.506,105.804 27.990,103.336 L8.226,83.956 C-1.924,74.002 -2.936,58.074 6.617,47.846 L49.412,2.023 Z" fill="{}"/>"#,
        theme.text
    );
    svg.push_str("      <path d=\"M40.606,72.001 C37.086,72.001 34.231,69.142 34.231,65.614 C34.231,62.087 37.086,59.228 40.606,59.228 L87.624,59.228 C91.145,59.228 94,62.087 94,65.614 C94,69.142 91.145,72.001 87.624,72.001 L40.606,72.001 Z\" fill=\"#B3B3B3\"/>\n");
    svg.push_str("    </g>\n");
    svg.push_str("  </g>\n");
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Metadata<'a> {
    username: &'a str,
    total_solved: u32,
    total_questions: u32,
    easy: &'a DifficultyCount,
    medium: &'a DifficultyCount,
    hard: &'a DifficultyCount,
    ranking: Ranking,
    generated_at: String,
    recent_submissions: &'a [RecentSubmission],
}

/// JSON sidecar with the card's numbers, read by CI to decide whether to commit.
pub fn render_metadata(
    record: &StatsRecord,
    generated_at: DateTime<Utc>,
    recent_submissions: &[RecentSubmission],
) -> Result<String, AppError> {
    let metadata = Metadata {
        username: record.username(),
        total_solved: record.total_solved(),
        total_questions: record.total_questions(),
        easy: record.easy(),
        medium: record.medium(),
        hard: record.hard(),
        ranking: record.ranking(),
        generated_at: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        recent_submissions,
    };
    Ok(serde_json::to_string_pretty(&metadata)?)
}
