// src/services/render.rs
use super::session_manager::Message;

/// Render a session as an HTML fragment, one block per message in order.
pub fn render_transcript(messages: &[Message]) -> String {
    let mut out = String::from("<div class=\"transcript\">\n");
    for m in messages {
        out.push_str(&format!(
            "  <div class=\"message {}\">{}</div>\n",
            m.role.as_str(),
            html_escape::encode_safe(&m.content).replace('\n', "<br>")
        ));
    }
    out.push_str("</div>\n");
    out
}
