// Drive folder URL helpers. Everything in the manifest refers to folders by
// URL; the API wants bare IDs.

use reqwest::Url;

const FOLDERS_SEGMENT: &str = "/folders/";

/// Extract the folder ID from a Google Drive folder URL.
///
/// Accepts both the `/drive/folders/<id>` form and the older `?id=<id>`
/// form, with or without a scheme. Returns `None` when neither is present.
pub fn folder_id_from_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url)
        .or_else(|_| Url::parse(&format!("https://{}", url)))
        .ok()?;

    if let Some(idx) = parsed.path().find(FOLDERS_SEGMENT) {
        let rest = &parsed.path()[idx + FOLDERS_SEGMENT.len()..];
        let id: String = rest.chars().take_while(|c| is_id_char(*c)).collect();
        if !id.is_empty() {
            return Some(id);
        }
    }

    parsed
        .query_pairs()
        .find(|(key, _)| key == "id")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}

/// The link stored in the manifest for a version folder.
pub fn sharing_url(folder_id: &str) -> String {
    format!("https://drive.google.com/drive/folders/{}?usp=sharing", folder_id)
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}
