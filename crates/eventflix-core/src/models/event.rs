use chrono::DateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<String>,
    #[serde(default)]
    pub price: f64,
    pub capacity: Option<u32>,
    #[serde(rename = "ticketsSold", default)]
    pub tickets_sold: u32,
    pub category: Option<String>,
    #[serde(rename = "organizerId")]
    pub organizer_id: Option<i64>,
}

impl Event {
    /// Remaining tickets, or None for events without a capacity limit
    pub fn tickets_available(&self) -> Option<u32> {
        self.capacity.map(|cap| cap.saturating_sub(self.tickets_sold))
    }

    pub fn is_sold_out(&self) -> bool {
        self.tickets_available() == Some(0)
    }

    pub fn formatted_date(&self) -> String {
        match &self.start_date {
            Some(date) => {
                if let Ok(dt) = DateTime::parse_from_rfc3339(date) {
                    dt.format("%d/%m/%Y %H:%M").to_string()
                } else {
                    // Fall back to the raw date part
                    date.chars().take(10).collect()
                }
            }
            None => "TBD".to_string(),
        }
    }

    pub fn formatted_price(&self) -> String {
        if self.price <= 0.0 {
            "Free".to_string()
        } else {
            format!("{:.2} €", self.price)
        }
    }
}

/// Body for creating or editing an event (organizers only)
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EventForm {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub location: String,
    #[serde(rename = "startDate")]
    pub start_date: String,
    pub price: f64,
    pub capacity: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(capacity: Option<u32>, sold: u32) -> Event {
        Event {
            id: 1,
            title: "Concert".to_string(),
            description: None,
            location: None,
            start_date: Some("2026-11-20T21:00:00+01:00".to_string()),
            price: 0.0,
            capacity,
            tickets_sold: sold,
            category: None,
            organizer_id: None,
        }
    }

    #[test]
    fn test_tickets_available() {
        assert_eq!(event(Some(100), 40).tickets_available(), Some(60));
        assert_eq!(event(Some(10), 12).tickets_available(), Some(0));
        assert!(event(Some(10), 10).is_sold_out());
        assert_eq!(event(None, 500).tickets_available(), None);
        assert!(!event(None, 500).is_sold_out());
    }

    #[test]
    fn test_formatted_date() {
        assert_eq!(event(None, 0).formatted_date(), "20/11/2026 21:00");

        let mut raw = event(None, 0);
        raw.start_date = Some("2026-11-20 21:00".to_string());
        assert_eq!(raw.formatted_date(), "2026-11-20");

        raw.start_date = None;
        assert_eq!(raw.formatted_date(), "TBD");
    }

    #[test]
    fn test_formatted_price() {
        let mut paid = event(None, 0);
        assert_eq!(paid.formatted_price(), "Free");
        paid.price = 12.5;
        assert_eq!(paid.formatted_price(), "12.50 €");
    }

    #[test]
    fn test_deserialize_minimal_event() {
        let parsed: Event = serde_json::from_str(r#"{"id":3,"title":"Expo"}"#).unwrap();
        assert_eq!(parsed.id, 3);
        assert_eq!(parsed.tickets_sold, 0);
        assert!(parsed.capacity.is_none());
    }
}
