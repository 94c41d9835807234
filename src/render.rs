// src/render.rs
//! HTML news card for an alert, and the plain-text view sent to chat.

use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::analyze::compose::Alert;
use crate::ingest::normalize_text;

/// Plain-text cap applied before the notifier's own limit.
pub const PLAIN_TEXT_MAX: usize = 1500;

/// Render the alert as a self-contained `<article>`.
pub fn render_card(alert: &Alert, updated_at: DateTime<Utc>) -> String {
    let headline = match alert.title.trim() {
        "" => format!("{} Update", alert.entity),
        h => h.to_string(),
    };
    let entity = match alert.entity.trim() {
        "" => "Country Music",
        e => e,
    };
    let dek = alert.summary.trim();
    let date_str = updated_at.format("%b %d, %Y %I:%M %p");

    let link_items: String = alert
        .sources
        .iter()
        .filter(|s| !s.url.is_empty())
        .map(|s| {
            let label = if s.label.trim().is_empty() {
                "Source"
            } else {
                s.label.as_str()
            };
            format!(
                r#"<li><a href="{}" rel="noopener" target="_blank">{}</a></li>"#,
                encode_double_quoted_attribute(&s.url),
                encode_text(label)
            )
        })
        .collect();
    let link_items = if link_items.is_empty() {
        "<li>No sources listed</li>".to_string()
    } else {
        link_items
    };
    let dek_html = if dek.is_empty() {
        String::new()
    } else {
        format!("<p style='margin:.5rem 0 1rem 0;'>{}</p>", encode_text(dek))
    };

    format!(
        r#"<article itemscope itemtype="https://schema.org/NewsArticle" style="font-family: system-ui, -apple-system, Segoe UI, Roboto, Arial; line-height:1.5;">
  <p style="color:#555;font-size:0.9rem;"><em>Updated: {date_str}</em></p>
  <h2 style="margin:.15rem 0 0 0;font-size:1.25rem;">{headline}</h2>
  <p style="margin:.35rem 0 .75rem 0;color:#444;"><strong>{entity}</strong></p>
  {dek_html}
  <h4 style="margin:.5rem 0 .35rem 0; font-size:1rem;">Sources</h4>
  <ul style="margin:.25rem 0 .5rem 1rem; padding:0;">
    {link_items}
  </ul>
</article>"#,
        headline = encode_text(&headline),
        entity = encode_text(entity),
    )
}

/// Strip markup and cap at `max_len` characters.
pub fn html_to_text(html: &str, max_len: usize) -> String {
    let text = normalize_text(html);
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect()
    } else {
        text
    }
}

/// Chat message for one alert: newspaper emoji + title, then the card as text.
pub fn alert_message(alert: &Alert, updated_at: DateTime<Utc>) -> String {
    let plain = html_to_text(&render_card(alert, updated_at), PLAIN_TEXT_MAX);
    let title = if alert.title.trim().is_empty() {
        "Alert"
    } else {
        alert.title.as_str()
    };
    format!("📰 {title}\n{plain}")
}
