use base64::Engine;
use rand::RngCore;
use rand::rngs::OsRng;

/// Map a media type to a file extension, e.g. "video/mp4" -> ".mp4".
/// Anything that is not exactly "type/subtype" falls back to ".bin".
pub fn media_type_to_ext(media_type: &str) -> String {
    let parts: Vec<&str> = media_type.split('/').collect();
    if parts.len() != 2 {
        return ".bin".to_string();
    }
    format!(".{}", parts[1])
}

/// Mint a random asset name: 32 bytes from the OS CSPRNG, URL-safe base64
/// without padding, plus the extension for the media type. Panics if the
/// OS randomness source fails.
pub fn new_asset_name(media_type: &str) -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let name = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes);
    format!("{}{}", name, media_type_to_ext(media_type))
}
