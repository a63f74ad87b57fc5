//! GDAL_METADATA band descriptions
//!
//! GDAL stores per-band descriptions in TIFF tag 42112 as a small XML
//! document:
//!
//! ```text
//! <GDALMetadata>
//!   <Item name="DESCRIPTION" sample="0" role="description">SR_B1</Item>
//!   ...
//! </GDALMetadata>
//! ```

/// Extract `(sample, description)` pairs from a GDAL_METADATA document.
///
/// Items other than band descriptions are ignored. The result is sorted by
/// sample index.
pub fn parse_band_descriptions(xml: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find("<Item") {
        rest = &rest[start + "<Item".len()..];
        let Some(tag_end) = rest.find('>') else { break };
        let attrs = &rest[..tag_end];
        let body_start = tag_end + 1;
        let Some(body_len) = rest[body_start..].find("</Item>") else { break };
        let body = &rest[body_start..body_start + body_len];
        rest = &rest[body_start + body_len..];

        if attribute(attrs, "name") != Some("DESCRIPTION") {
            continue;
        }
        if let Some(role) = attribute(attrs, "role") {
            if role != "description" {
                continue;
            }
        }
        let Some(sample) = attribute(attrs, "sample").and_then(|s| s.parse::<usize>().ok()) else {
            continue;
        };
        out.push((sample, unescape(body.trim())));
    }

    out.sort_by_key(|(sample, _)| *sample);
    out
}

fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", name);
    let mut search = attrs;
    loop {
        let pos = search.find(&needle)?;
        // Require a word boundary so `sample` does not match `resample`
        let boundary = pos == 0 || search[..pos].ends_with(char::is_whitespace);
        let value_start = pos + needle.len();
        if boundary {
            let value_len = search[value_start..].find('"')?;
            return Some(&search[value_start..value_start + value_len]);
        }
        search = &search[value_start..];
    }
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
