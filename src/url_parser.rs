//! Share link parsing and reconstruction for the share-based drivers.

use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::{BatchError, Result};

/// Base of Aliyun Drive share links.
pub const ALIYUN_SHARE_BASE: &str = "https://www.aliyundrive.com/s/";

/// Base of PikPak share links.
pub const PIKPAK_SHARE_BASE: &str = "https://mypikpak.com/s/";

/// Folder id Aliyun Drive uses for the top of a share.
const ALIYUN_ROOT_FOLDER: &str = "root";

/// The parts of a share link a mount needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareLink {
    pub share_id: String,
    pub folder_id: String,
    pub password: String,
}

/// Parse an Aliyun Drive link of the form `/s/<shareId>/folder/<folderId>[?pwd=..]`.
///
/// # Examples
///
/// ```
/// use openlist_batch::url_parser::parse_aliyun_share;
///
/// let link = parse_aliyun_share("https://www.aliyundrive.com/s/abc/folder/def?pwd=x1").unwrap();
/// assert_eq!(link.share_id, "abc");
/// assert_eq!(link.folder_id, "def");
/// assert_eq!(link.password, "x1");
/// ```
pub fn parse_aliyun_share(share_url: &str) -> Result<ShareLink> {
    let url = parse_url(share_url)?;
    let segments = path_segments(&url);

    // ["", "s", shareId, "folder", folderId]
    if segments.len() < 5 {
        return Err(BatchError::invalid_descriptor(
            share_url,
            "expected /s/<shareId>/folder/<folderId>",
        ));
    }
    if segments[1] != "s" || segments[3] != "folder" {
        return Err(BatchError::invalid_descriptor(
            share_url,
            "expected /s/<shareId>/folder/<folderId>",
        ));
    }

    let link = ShareLink {
        share_id: segments[2].clone(),
        folder_id: segments[4].clone(),
        password: share_password(&url),
    };
    require_share_id(share_url, link)
}

/// Parse a PikPak link of the form `/s/<shareId>[/<folderId>][?pwd=..]`.
pub fn parse_pikpak_share(share_url: &str) -> Result<ShareLink> {
    let url = parse_url(share_url)?;
    let segments = path_segments(&url);

    // ["", "s", shareId, folderId?]
    if segments.len() < 3 || segments[1] != "s" {
        return Err(BatchError::invalid_descriptor(
            share_url,
            "expected /s/<shareId>[/<folderId>]",
        ));
    }

    let link = ShareLink {
        share_id: segments[2].clone(),
        folder_id: segments.get(3).cloned().unwrap_or_default(),
        password: share_password(&url),
    };
    require_share_id(share_url, link)
}

/// Rebuild an Aliyun Drive share link. An empty folder id points at the share root.
pub fn aliyun_share_url(link: &ShareLink) -> String {
    let folder = if link.folder_id.is_empty() {
        ALIYUN_ROOT_FOLDER
    } else {
        &link.folder_id
    };
    let path = format!("{}{}/folder/{}", ALIYUN_SHARE_BASE, link.share_id, folder);
    with_password(path, &link.password)
}

/// Rebuild a PikPak share link.
pub fn pikpak_share_url(link: &ShareLink) -> String {
    let mut path = format!("{}{}", PIKPAK_SHARE_BASE, link.share_id);
    if !link.folder_id.is_empty() {
        path.push('/');
        path.push_str(&link.folder_id);
    }
    with_password(path, &link.password)
}

fn parse_url(share_url: &str) -> Result<Url> {
    Url::parse(share_url.trim())
        .map_err(|e| BatchError::invalid_descriptor(share_url, format!("not a URL: {}", e)))
}

/// Split the path into percent-decoded segments, keeping the leading empty one.
fn path_segments(url: &Url) -> Vec<String> {
    url.path()
        .split('/')
        .map(|segment| percent_decode_str(segment).decode_utf8_lossy().into_owned())
        .collect()
}

fn share_password(url: &Url) -> String {
    url.query_pairs()
        .find(|(key, _)| key == "pwd")
        .map(|(_, value)| value.into_owned())
        .unwrap_or_default()
}

fn require_share_id(share_url: &str, link: ShareLink) -> Result<ShareLink> {
    if link.share_id.is_empty() {
        return Err(BatchError::invalid_descriptor(share_url, "empty share id"));
    }
    Ok(link)
}

fn with_password(path: String, password: &str) -> String {
    if password.is_empty() {
        return path;
    }
    match Url::parse(&path) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("pwd", password);
            url.to_string()
        }
        Err(_) => format!("{}?pwd={}", path, password),
    }
}
