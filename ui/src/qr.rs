use chrono::{DateTime, Utc};
use qrcode::render::unicode;
use qrcode::{EcLevel, QrCode};

use fichedesk_core::{targets, Fiche};

/// Verification payload encoded on the printed badge. Kept to the identity
/// lines so the code stays small enough to scan from paper.
pub fn badge_payload(fiche: &Fiche, issued_at: DateTime<Utc>) -> String {
    format!(
        "FICHE {}\n{}\n{} {}\n{}",
        fiche.sequence,
        fiche.name,
        fiche.site,
        fiche.dimension,
        issued_at.format("%Y-%m-%d")
    )
}

/// Renders the payload as a half-block unicode QR code, one line per text
/// row. Returns `None` only if the payload exceeds the symbol capacity,
/// which the identity payload never does in practice.
pub fn render_badge(payload: &str) -> Option<String> {
    match QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M) {
        Ok(code) => Some(
            code.render::<unicode::Dense1x2>()
                .quiet_zone(true)
                .build(),
        ),
        Err(error) => {
            tracing::warn!(target: targets::UI, error = %error, "QR badge rendering failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_identity_lines() {
        let mut fiche = Fiche::new("042");
        fiche.name = "KABONGO MWAMBA".to_string();
        fiche.site = "KINGAKATI".to_string();
        fiche.dimension = "15x20".to_string();

        let issued_at = "2026-03-05T09:00:00Z".parse().expect("timestamp");
        let payload = badge_payload(&fiche, issued_at);
        assert_eq!(
            payload,
            "FICHE 042\nKABONGO MWAMBA\nKINGAKATI 15x20\n2026-03-05"
        );
    }

    #[test]
    fn badge_renders_to_block_art() {
        let badge = render_badge("FICHE 001\nKABONGO").expect("badge");
        assert!(badge.lines().count() > 10);
        assert!(badge.contains('█'));
    }
}
