//! Template variants and their typed parameters.
//!
//! Each template has a fixed parameter record. Optional fields get their
//! defaults at deserialization time, so by the time a job is created its
//! parameters are complete and validated.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::{Error, Result};

/// Output frame size for every template (vertical 9:16).
pub const FRAME_WIDTH: u32 = 1080;
pub const FRAME_HEIGHT: u32 = 1920;

/// Opening and closing frames.
const BASE_DURATION_MS: u64 = 10_000;
/// Extra frame showing the dethroned king.
const DETHRONED_FRAME_MS: u64 = 3_500;
/// Extra frame listing eliminated players.
const VICTIMS_FRAME_MS: u64 = 3_500;

const MAX_VICTIMS: usize = 10;

/// Largest accepted amount. Its value in cents still fits exactly in an `f64`.
pub const MAX_AMOUNT: f64 = 1e13;

/// Template variant identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TemplateId {
    /// A new king takes the throne.
    A,
    /// A new king takes the throne from a named predecessor.
    B,
    /// Fully dynamic layout: optional predecessor and eliminated players.
    C,
}

impl TemplateId {
    pub const ALL: [TemplateId; 3] = [TemplateId::A, TemplateId::B, TemplateId::C];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateId::A => "A",
            TemplateId::B => "B",
            TemplateId::C => "C",
        }
    }

    /// Human-friendly alias, also accepted by [`FromStr`].
    pub fn alias(&self) -> &'static str {
        match self {
            TemplateId::A => "crowned",
            TemplateId::B => "dethroned",
            TemplateId::C => "dynamic",
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        TemplateId::ALL
            .into_iter()
            .find(|t| {
                t.as_str().eq_ignore_ascii_case(needle) || t.alias().eq_ignore_ascii_case(needle)
            })
            .ok_or_else(|| Error::UnknownTemplate(s.to_string()))
    }
}

/// Audience region. Selects the publishing account and the amount format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Region {
    #[default]
    #[serde(alias = "br")]
    Br,
    #[serde(alias = "global")]
    Global,
}

impl Region {
    pub fn as_str(&self) -> &'static str {
        match self {
            Region::Br => "BR",
            Region::Global => "GLOBAL",
        }
    }

    pub fn currency_symbol(&self) -> &'static str {
        match self {
            Region::Br => "R$",
            Region::Global => "$",
        }
    }

    pub fn hashtags(&self) -> &'static str {
        match self {
            Region::Br => "#throneclash #ganhador #leilao #pix",
            Region::Global => "#throneclash #crypto #game #winner",
        }
    }

    /// Format an amount with two decimals and regional separators:
    /// `1.234,56` for BR, `1,234.56` for GLOBAL.
    pub fn format_amount(&self, amount: f64) -> String {
        let (thousands, decimal) = match self {
            Region::Br => ('.', ','),
            Region::Global => (',', '.'),
        };

        // Validation keeps amounts within 0..=MAX_AMOUNT.
        let cents = (amount.max(0.0) * 100.0).round() as u64;
        let digits = (cents / 100).to_string();

        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(thousands);
            }
            grouped.push(ch);
        }

        format!("{}{}{:02}", grouped, decimal, cents % 100)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_hook() -> String {
    "O REI CAIU!".to_string()
}

fn default_cta() -> String {
    "QUEM VAI DESAFIAR?".to_string()
}

fn default_event_type() -> String {
    "GOLPE NO TRONO".to_string()
}

fn default_cause() -> String {
    "EMPURRADO".to_string()
}

fn default_old_position() -> u32 {
    9
}

/// Fields shared by every template: the new king and the framing texts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KingParams {
    pub king_name: String,
    pub king_photo_url: String,
    pub amount: f64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub region: Region,
    #[serde(default = "default_hook")]
    pub hook: String,
    #[serde(default = "default_cta")]
    pub cta: String,
    /// Keep the rendered file on disk after publishing.
    #[serde(default)]
    pub persist_file: bool,
}

/// Parameters for template B.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DethronedParams {
    #[serde(flatten)]
    pub king: KingParams,
    pub dethroned_name: String,
    pub dethroned_photo_url: String,
    #[serde(default)]
    pub dethroned_reign_days: u32,
}

/// A player knocked off the ranking, shown by template C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Victim {
    pub name: String,
    pub photo_url: String,
    #[serde(default = "default_cause")]
    pub cause: String,
    #[serde(default = "default_old_position")]
    pub old_position: u32,
}

/// Parameters for template C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicParams {
    #[serde(flatten)]
    pub king: KingParams,
    #[serde(default = "default_event_type")]
    pub event_type: String,
    #[serde(default)]
    pub dethroned_name: Option<String>,
    #[serde(default)]
    pub dethroned_photo_url: Option<String>,
    #[serde(default)]
    pub dethroned_reign_days: u32,
    #[serde(default)]
    pub victims: Vec<Victim>,
}

/// Validated parameters, tagged by template.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TemplateParams {
    A(KingParams),
    B(DethronedParams),
    C(DynamicParams),
}

/// Frame size and duration derived from a template's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderPlan {
    pub width: u32,
    pub height: u32,
    pub duration_ms: u64,
}

impl TemplateParams {
    /// Resolve a template name and a raw JSON payload into validated parameters.
    pub fn from_request(template: &str, params: serde_json::Value) -> Result<Self> {
        let template: TemplateId = template.parse()?;
        Self::parse(template, params)
    }

    /// Deserialize and validate a raw payload for a known template.
    pub fn parse(template: TemplateId, params: serde_json::Value) -> Result<Self> {
        let invalid = |e: serde_json::Error| Error::InvalidParameters(e.to_string());
        let parsed = match template {
            TemplateId::A => TemplateParams::A(serde_json::from_value(params).map_err(invalid)?),
            TemplateId::B => TemplateParams::B(serde_json::from_value(params).map_err(invalid)?),
            TemplateId::C => TemplateParams::C(serde_json::from_value(params).map_err(invalid)?),
        };
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn template_id(&self) -> TemplateId {
        match self {
            TemplateParams::A(_) => TemplateId::A,
            TemplateParams::B(_) => TemplateId::B,
            TemplateParams::C(_) => TemplateId::C,
        }
    }

    pub fn king(&self) -> &KingParams {
        match self {
            TemplateParams::A(p) => p,
            TemplateParams::B(p) => &p.king,
            TemplateParams::C(p) => &p.king,
        }
    }

    pub fn region(&self) -> Region {
        self.king().region
    }

    pub fn persist_file(&self) -> bool {
        self.king().persist_file
    }

    pub fn render_plan(&self) -> RenderPlan {
        let (dethroned, victims) = match self {
            TemplateParams::A(_) => (false, false),
            TemplateParams::B(_) => (true, false),
            TemplateParams::C(p) => (p.dethroned_name.is_some(), !p.victims.is_empty()),
        };

        let mut duration_ms = BASE_DURATION_MS;
        if dethroned {
            duration_ms += DETHRONED_FRAME_MS;
        }
        if victims {
            duration_ms += VICTIMS_FRAME_MS;
        }

        RenderPlan {
            width: FRAME_WIDTH,
            height: FRAME_HEIGHT,
            duration_ms,
        }
    }

    /// Check field contents that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let king = self.king();
        require_text("king_name", &king.king_name)?;
        require_photo_url("king_photo_url", &king.king_photo_url)?;
        if !king.amount.is_finite() || king.amount < 0.0 {
            return Err(Error::InvalidParameters(format!(
                "amount must be a non-negative number, got {}",
                king.amount
            )));
        }
        if king.amount > MAX_AMOUNT {
            return Err(Error::InvalidParameters(format!(
                "amount must not exceed {}, got {}",
                MAX_AMOUNT, king.amount
            )));
        }

        match self {
            TemplateParams::A(_) => {}
            TemplateParams::B(p) => {
                require_text("dethroned_name", &p.dethroned_name)?;
                require_photo_url("dethroned_photo_url", &p.dethroned_photo_url)?;
            }
            TemplateParams::C(p) => {
                if let Some(name) = &p.dethroned_name {
                    require_text("dethroned_name", name)?;
                }
                if let Some(url) = &p.dethroned_photo_url {
                    require_photo_url("dethroned_photo_url", url)?;
                }
                if p.victims.len() > MAX_VICTIMS {
                    return Err(Error::InvalidParameters(format!(
                        "at most {} victims are supported, got {}",
                        MAX_VICTIMS,
                        p.victims.len()
                    )));
                }
                for victim in &p.victims {
                    require_text("victims.name", &victim.name)?;
                    require_photo_url("victims.photo_url", &victim.photo_url)?;
                }
            }
        }

        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidParameters(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn require_photo_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| Error::InvalidParameters(format!("{} is not a valid URL: {}", field, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::InvalidParameters(format!(
            "{} must use http or https, got {}",
            field, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn crowned() -> serde_json::Value {
        json!({
            "king_name": "Ana",
            "king_photo_url": "https://x/y.jpg",
            "amount": 10.0,
            "message": "hi"
        })
    }

    #[test]
    fn test_template_id_parsing() {
        assert_eq!("A".parse::<TemplateId>().unwrap(), TemplateId::A);
        assert_eq!("b".parse::<TemplateId>().unwrap(), TemplateId::B);
        assert_eq!("Dynamic".parse::<TemplateId>().unwrap(), TemplateId::C);
        assert!(matches!(
            "Z".parse::<TemplateId>(),
            Err(Error::UnknownTemplate(t)) if t == "Z"
        ));
    }

    #[test]
    fn test_defaults_resolved_at_parse() {
        let params = TemplateParams::parse(TemplateId::A, crowned()).unwrap();
        let king = params.king();
        assert_eq!(king.region, Region::Br);
        assert_eq!(king.hook, "O REI CAIU!");
        assert_eq!(king.cta, "QUEM VAI DESAFIAR?");
        assert!(!king.persist_file);
        assert_eq!(king.message.as_deref(), Some("hi"));
    }

    #[test]
    fn test_from_request_rejects_unknown_template() {
        let err = TemplateParams::from_request("Z", crowned()).unwrap_err();
        assert!(err.is_validation());
        assert!(matches!(err, Error::UnknownTemplate(_)));
    }

    #[test]
    fn test_missing_required_field() {
        let err = TemplateParams::parse(TemplateId::A, json!({ "king_name": "Ana" })).unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)));
    }

    #[test]
    fn test_template_b_requires_dethroned_king() {
        let err = TemplateParams::parse(TemplateId::B, crowned()).unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)));

        let mut payload = crowned();
        payload["dethroned_name"] = json!("Bruno");
        payload["dethroned_photo_url"] = json!("https://x/b.jpg");
        let params = TemplateParams::parse(TemplateId::B, payload).unwrap();
        match &params {
            TemplateParams::B(p) => assert_eq!(p.dethroned_reign_days, 0),
            other => panic!("expected template B, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut negative = crowned();
        negative["amount"] = json!(-1.0);
        assert!(TemplateParams::parse(TemplateId::A, negative).is_err());

        let mut blank = crowned();
        blank["king_name"] = json!("   ");
        assert!(TemplateParams::parse(TemplateId::A, blank).is_err());

        let mut ftp = crowned();
        ftp["king_photo_url"] = json!("ftp://x/y.jpg");
        assert!(TemplateParams::parse(TemplateId::A, ftp).is_err());

        let mut relative = crowned();
        relative["king_photo_url"] = json!("y.jpg");
        assert!(TemplateParams::parse(TemplateId::A, relative).is_err());
    }

    #[test]
    fn test_victim_limit() {
        let mut payload = crowned();
        let victim = json!({ "name": "V", "photo_url": "https://x/v.jpg" });
        payload["victims"] = json!(vec![victim; MAX_VICTIMS + 1]);
        assert!(TemplateParams::parse(TemplateId::C, payload).is_err());
    }

    #[test]
    fn test_render_plan_durations() {
        let a = TemplateParams::parse(TemplateId::A, crowned()).unwrap();
        assert_eq!(a.render_plan().duration_ms, 10_000);
        assert_eq!(a.render_plan().width, 1080);
        assert_eq!(a.render_plan().height, 1920);

        let mut payload = crowned();
        payload["dethroned_name"] = json!("Bruno");
        payload["victims"] = json!([{ "name": "V", "photo_url": "https://x/v.jpg" }]);
        let c = TemplateParams::parse(TemplateId::C, payload).unwrap();
        assert_eq!(c.render_plan().duration_ms, 17_000);
        match &c {
            TemplateParams::C(p) => {
                assert_eq!(p.victims[0].cause, "EMPURRADO");
                assert_eq!(p.victims[0].old_position, 9);
            }
            other => panic!("expected template C, got {:?}", other),
        }
    }

    #[test]
    fn test_region_parsing_and_format() {
        let mut payload = crowned();
        payload["region"] = json!("global");
        let params = TemplateParams::parse(TemplateId::A, payload).unwrap();
        assert_eq!(params.region(), Region::Global);

        assert_eq!(Region::Br.format_amount(1234.5), "1.234,50");
        assert_eq!(Region::Global.format_amount(1234567.891), "1,234,567.89");
        assert_eq!(Region::Global.format_amount(10.0), "10.00");
        assert_eq!(Region::Br.format_amount(0.0), "0,00");
    }

    #[test]
    fn test_amount_upper_bound() {
        let mut largest = crowned();
        largest["amount"] = json!(MAX_AMOUNT);
        let params = TemplateParams::parse(TemplateId::A, largest).unwrap();
        assert_eq!(
            params.region().format_amount(params.king().amount),
            "10.000.000.000.000,00"
        );

        for too_large in [1.000_000_1e13, 1e20, f64::MAX] {
            let mut payload = crowned();
            payload["amount"] = json!(too_large);
            let err = TemplateParams::parse(TemplateId::A, payload).unwrap_err();
            assert!(matches!(err, Error::InvalidParameters(_)), "{}", too_large);
        }
    }
}
