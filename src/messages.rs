use teloxide::utils::markdown::{bold, escape, link};

use crate::lookup::TicketLink;

fn link_list(links: &[TicketLink]) -> String {
    links
        .iter()
        .map(|l| format!("• {}", link(&l.url, &escape(&l.site))))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn welcome() -> String {
    escape(
        "👋 Merhaba, ben FenerMacaBot.\n\n\
        Hangi takımın maçına bilet arıyorsunuz?\n\
        Aşağıdaki listeden bir Süper Lig takımı seçin 👇",
    )
}

pub fn help() -> String {
    escape(
        "/start ile bir takım seç, ben de bilet sitelerinde arayayım. \
        Bilet yoksa satışa çıktığında sana haber verebilirim.",
    )
}

pub fn searching(team: &str) -> String {
    format!(
        "🔍 {} için bilet arıyorum, lütfen bekleyin\\.\\.\\.",
        bold(&escape(team))
    )
}

pub fn tickets_found(team: &str, links: &[TicketLink]) -> String {
    format!(
        "🎫 {} için aşağıdaki sitelerde bilet buldum:\n{}",
        bold(&escape(team)),
        link_list(links)
    )
}

pub fn tickets_not_found(team: &str) -> String {
    format!(
        "❌ Şu anda {} için aktif bilet bulamadım\\.\n\n{}",
        bold(&escape(team)),
        escape("📢 Bilet satışa çıktığında sana bildirim göndermemi ister misin?")
    )
}

pub fn subscribed(team: &str) -> String {
    escape(&format!(
        "📌 Tamamdır, {team} maçı için bilet satışa çıktığında sana Telegram üzerinden haber vereceğim."
    ))
}

pub fn not_subscribed() -> String {
    escape("Tamamdır, abonelik kaydedilmedi. İstediğin zaman /start ile tekrar takım seçebilirsin.")
}

pub fn tickets_available(team: &str, links: &[TicketLink]) -> String {
    format!(
        "📢 {} için bilet bulundu\\!\n{}",
        bold(&escape(team)),
        link_list(links)
    )
}

pub fn ticket_hint() -> String {
    escape("🎟 Hangi takım için bilet aradığını belirtmek için /start komutunu kullan :)")
}

pub fn acknowledged() -> String {
    escape("Mesajını aldım. Bilet aramak için /start yazabilirsin.")
}

pub fn started(teams: usize) -> String {
    escape(&format!("FenerMacaBot başladı, {teams} takım yüklendi."))
}

pub const NOTIFY_YES_BUTTON: &str = "Evet, bilet çıkınca haber ver";
pub const NOTIFY_NO_BUTTON: &str = "Hayır";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_keep_raw_urls() {
        let links = [
            TicketLink::new("Mobilet", "https://mobilet.com/x"),
            TicketLink::new("Passo", "https://www.passo.com.tr/tr/etkinlik/fb-gs_1"),
        ];
        let msg = tickets_available("Fenerbahçe", &links);
        assert!(msg.contains("*Fenerbahçe*"));
        assert!(msg.contains("[Mobilet](https://mobilet.com/x)"));
        assert!(msg.contains("(https://www.passo.com.tr/tr/etkinlik/fb-gs_1)"));
    }

    #[test]
    fn team_names_are_escaped() {
        assert!(searching("Başakşehir F.K.").contains("Başakşehir F\\.K\\."));
        assert!(subscribed("A-Takım").contains("A\\-Takım"));
    }
}
