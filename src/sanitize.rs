use anyhow::Context as _;
use kuchiki::traits::TendrilSink as _;

use crate::richtext::is_safe_href;

/// Players become plain links; scripts, handlers and unsafe URLs are dropped.
pub fn sanitize_embed(raw: &str) -> anyhow::Result<String> {
    if raw.trim().is_empty() {
        return Ok(String::new());
    }
    let document = kuchiki::parse_html().one(raw);

    for selector in ["script", "object", "embed", "style", "link", "meta"] {
        if let Ok(nodes) = document.select(selector) {
            for node in nodes.collect::<Vec<_>>() {
                node.as_node().detach();
            }
        }
    }

    for selector in ["iframe", "audio", "video"] {
        if let Ok(nodes) = document.select(selector) {
            for node in nodes.collect::<Vec<_>>() {
                let href = node
                    .attributes
                    .borrow()
                    .get("src")
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                if let Some(link) = make_link_node(&href) {
                    node.as_node().insert_before(link);
                }
                node.as_node().detach();
            }
        }
    }

    if let Ok(nodes) = document.select("*") {
        for node in nodes {
            let mut attrs = node.attributes.borrow_mut();
            let names: Vec<String> = attrs
                .map
                .keys()
                .map(|k| k.local.to_string())
                .collect();
            for name in names {
                let lowered = name.to_ascii_lowercase();
                if lowered.starts_with("on") || lowered == "style" || lowered == "srcdoc" {
                    attrs.remove(name.as_str());
                    continue;
                }
                if lowered == "href" || lowered == "src" {
                    let keep = attrs.get(name.as_str()).is_some_and(is_safe_href);
                    if !keep {
                        attrs.remove(name.as_str());
                    }
                }
            }
        }
    }

    // Serialize body children only.
    let body = document
        .select_first("body")
        .ok()
        .map(|n| n.as_node().clone());

    let mut out = Vec::new();
    if let Some(body) = body {
        for child in body.children() {
            child.serialize(&mut out).context("serialize embed child")?;
        }
    }
    String::from_utf8(out).context("embed html not utf-8")
}

fn make_link_node(href: &str) -> Option<kuchiki::NodeRef> {
    let safe = href.trim();
    if !is_safe_href(safe) {
        return None;
    }
    let frag = format!(
        "<p><a href=\"{}\" rel=\"noreferrer noopener\">{}</a></p>",
        html_escape_attr(safe),
        html_escape_text(safe)
    );
    let doc = kuchiki::parse_html().one(frag);
    doc.select_first("p").ok().map(|n| n.as_node().clone())
}

fn html_escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn html_escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
