use crate::core::config::data::Config;

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

impl Config {
    pub fn print_all(&self) {
        println!("Current configuration:");
        println!("  verify-crc: {}", on_off(self.verify_crc()));
        println!("  replace-existing: {}", on_off(self.replace_existing()));
        println!("  pretty: {}", on_off(self.pretty()));
        println!("  validate-cards: {}", on_off(self.validate_cards()));
    }
}
