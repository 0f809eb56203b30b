// Dashboard — HTML rendering
// render_dashboard, render_qr_page, format_uptime, escape_html

use crate::atoms::constants::{DASHBOARD_REFRESH_SECS, QR_PAGE_REFRESH_SECS};
use crate::engine::state::{BotState, PendingPairing};
use log::warn;
use qrcode::render::svg;
use qrcode::QrCode;
use std::time::Duration;

const STYLE: &str = "body{font-family:system-ui,sans-serif;background:#0b141a;color:#e9edef;\
max-width:640px;margin:40px auto;padding:0 16px}\
.card{background:#202c33;border-radius:12px;padding:20px;margin-bottom:16px}\
.ok{color:#25d366}.warn{color:#f7b928}.muted{color:#8696a0}\
a{color:#53bdeb}img{background:#fff;padding:12px;border-radius:8px}\
pre{white-space:pre-wrap;word-break:break-all}";

fn page(title: &str, refresh_secs: u32, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
<meta http-equiv=\"refresh\" content=\"{refresh_secs}\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        title = escape_html(title),
    )
}

/// GET / — status, uptime, counters, and a scan link while pairing is pending.
pub fn render_dashboard(state: &BotState, uptime: Duration) -> String {
    let status_class = if state.ready { "ok" } else { "warn" };
    let last_message = state
        .last_message_at
        .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "never".into());
    let identity = match &state.connected_as {
        Some(info) => format!(
            "<p>Connected as <strong>{}</strong> ({})</p>",
            escape_html(info.pushname.as_deref().unwrap_or("Unknown")),
            escape_html(&info.wid),
        ),
        None => String::new(),
    };
    let pairing = if state.has_qr() {
        "<div class=\"card\"><p class=\"warn\">A pairing code is waiting.</p>\
<p><a href=\"/qr-image\">Scan the QR code</a> with WhatsApp on your phone \
(Settings → Linked devices).</p></div>"
    } else {
        ""
    };

    let body = format!(
        "<h1>WhatsApp Read Bot</h1>\n\
<div class=\"card\">\n<p>Status: <strong class=\"{status_class}\">{status}</strong></p>\n{identity}\n\
<p>Uptime: {uptime}</p>\n<p>Messages processed: {count}</p>\n<p>Last message: {last_message}</p>\n</div>\n\
{pairing}\n<p class=\"muted\">Auto-refreshes every {DASHBOARD_REFRESH_SECS}s · \
<a href=\"/health\">health</a> · <a href=\"/api/status\">status JSON</a></p>",
        status = escape_html(&state.status),
        uptime = format_uptime(uptime),
        count = state.message_count,
    );
    page("WhatsApp Read Bot", DASHBOARD_REFRESH_SECS, &body)
}

/// GET /qr-image — the rendered pairing image, the raw code, or a placeholder.
pub fn render_qr_page(pairing: Option<&PendingPairing>) -> String {
    let body = match pairing {
        Some(pending) => {
            let visual = match &pending.code.image {
                Some(image) => format!("<img src=\"{}\" alt=\"WhatsApp pairing QR code\" width=\"280\" height=\"280\">",
                    escape_html(image)),
                None => match render_qr_svg(&pending.code.payload) {
                    Some(svg) => svg,
                    None => format!("<p>Encode this payload as a QR code:</p><pre>{}</pre>",
                        escape_html(&pending.code.payload)),
                },
            };
            format!(
                "<h1>Scan to link WhatsApp</h1>\n<div class=\"card\">{visual}\n\
<p class=\"muted\">Issued at {issued}. Codes rotate; this page refreshes every {QR_PAGE_REFRESH_SECS}s.</p></div>",
                issued = pending.issued_at.format("%H:%M:%S UTC"),
            )
        }
        None => "<h1>No pairing code</h1>\n<div class=\"card\"><p>No QR code is pending. \
The bot is either already linked or still starting.</p></div>"
            .to_string(),
    };
    let body = format!("{body}\n<p><a href=\"/\">← Back to dashboard</a></p>");
    page("WhatsApp Pairing", QR_PAGE_REFRESH_SECS, &body)
}

/// Inline SVG for a payload the backend sent without a pre-rendered image.
fn render_qr_svg(payload: &str) -> Option<String> {
    let code = match QrCode::new(payload.as_bytes()) {
        Ok(code) => code,
        Err(e) => {
            warn!("[dashboard] Could not encode pairing payload as QR: {}", e);
            return None;
        }
    };
    let image = code
        .render::<svg::Color>()
        .min_dimensions(280, 280)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();
    // Drop the XML prolog so the SVG can sit inline in HTML.
    let start = image.find("<svg").unwrap_or(0);
    Some(image[start..].to_string())
}

/// "1d 2h 3m 4s", dropping leading zero units.
pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    let (days, hours, minutes, seconds) = (secs / 86_400, (secs % 86_400) / 3600, (secs % 3600) / 60, secs % 60);
    if days > 0 {
        format!("{days}d {hours}h {minutes}m {seconds}s")
    } else if hours > 0 {
        format!("{hours}h {minutes}m {seconds}s")
    } else if minutes > 0 {
        format!("{minutes}m {seconds}s")
    } else {
        format!("{seconds}s")
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
