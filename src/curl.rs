//! cURL rendering
//!
//! Pretty-prints a composed wire request as a `curl -v` command line for
//! debugging: `-X <METHOD>`, one `-H` per header in store order, the body as
//! `--data` (text) or `--data-binary @<path>` (file), and the fully resolved
//! URL last. Continuation lines are joined with `\` + newline + tab.

use crate::request::WireRequest;

/// Render a wire request as a `curl -v` invocation.
pub fn render(request: &WireRequest) -> String {
    let mut lines = vec![format!("curl -v -X {}", request.method)];

    for header in request.headers.iter() {
        lines.push(format!("-H \"{}: {}\"", header.name, header.value));
    }

    if let Some(path) = &request.body_file {
        lines.push(format!("--data-binary @{}", path.display()));
    } else if let Some(body) = &request.body {
        match std::str::from_utf8(body) {
            Ok(text) => lines.push(format!("--data '{}'", text.replace('\'', "\\'"))),
            Err(_) => lines.push(format!("--data-binary '<{} bytes>'", body.len())),
        }
    }

    lines.push(format!("\"{}\"", request.url));
    lines.join(" \\\n\t")
}
