use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct TicketPurchase {
    #[serde(rename = "eventId")]
    pub event_id: i64,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    #[serde(rename = "eventId")]
    pub event_id: i64,
    #[serde(rename = "eventTitle")]
    pub event_title: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(rename = "totalPrice", default)]
    pub total_price: f64,
    #[serde(rename = "purchasedAt")]
    pub purchased_at: Option<String>,
    #[serde(rename = "invoiceUrl")]
    pub invoice_url: Option<String>,
}

fn default_quantity() -> u32 {
    1
}

impl Ticket {
    pub fn display_title(&self) -> String {
        self.event_title
            .clone()
            .unwrap_or_else(|| format!("Event #{}", self.event_id))
    }
}
