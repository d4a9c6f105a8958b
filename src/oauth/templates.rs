//! Callback popup page
//!
//! The page posts the exchange result to `window.opener` using the CMS
//! popup-message protocol, then closes itself.

use serde_json::{Value, json};

use super::types::ExchangeOutcome;

/// Messages posted to the opener, in order
pub fn popup_messages(provider: &str, outcome: &ExchangeOutcome) -> Vec<Value> {
    match outcome {
        ExchangeOutcome::Granted { access_token } => vec![
            Value::String(format!("authorization:{}:success:{}", provider, access_token)),
            json!({ "token": access_token, "provider": provider }),
        ],
        ExchangeOutcome::Denied { error } => vec![
            Value::String(format!("authorization:{}:error:{}", provider, error)),
            json!({ "error": error, "provider": provider }),
        ],
        ExchangeOutcome::Failed { message } => vec![Value::String(format!(
            "authorization:{}:error:{}",
            provider, message
        ))],
    }
}

/// Serialize a value as a JavaScript literal that is safe inside `<script>`
fn script_literal(value: &Value) -> String {
    let raw = serde_json::to_string(value).unwrap_or_else(|_| "null".to_string());
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}

/// Render the callback popup document
pub fn render_callback_page(provider: &str, target_origin: &str, outcome: &ExchangeOutcome) -> String {
    let messages = Value::Array(popup_messages(provider, outcome));
    let target = Value::String(target_origin.to_string());

    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Authorizing…</title></head>
<body>
<script>
  (function() {{
    var messages = {messages};
    var target = {target};
    function send(msg) {{
      if (window.opener) {{
        window.opener.postMessage(msg, target);
      }}
    }}
    for (var i = 0; i < messages.length; i++) {{
      send(messages[i]);
    }}
    window.close();
  }})();
</script>
Closing…
</body>
</html>"#,
        messages = script_literal(&messages),
        target = script_literal(&target),
    )
}
