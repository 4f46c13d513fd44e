use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for persisted evaluations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvaluationId(pub String);

/// Verdict produced for a charge. `Undecided` is the identity value: it is
/// the starting point of every track and never overwrites a resolved value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    #[default]
    Undecided,
    Accepted,
    Declined,
}

impl Decision {
    pub const fn label(self) -> &'static str {
        match self {
            Decision::Undecided => "undecided",
            Decision::Accepted => "accepted",
            Decision::Declined => "declined",
        }
    }

    /// Normalize a raw label; anything unrecognized maps to `Undecided`.
    pub fn from_label(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "accepted" => Decision::Accepted,
            "declined" => Decision::Declined,
            _ => Decision::Undecided,
        }
    }

    pub const fn is_undecided(self) -> bool {
        matches!(self, Decision::Undecided)
    }
}

/// One step of a charge's console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Blacklist,
    Whitelist,
    Graylist,
    CompanyRules,
    GlobalRules,
    FamilyCompanyRules,
    FamilyMccRules,
    YellowFlag,
    IdentityModule,
}

impl ComponentKind {
    pub const fn label(self) -> &'static str {
        match self {
            ComponentKind::Blacklist => "blacklist",
            ComponentKind::Whitelist => "whitelist",
            ComponentKind::Graylist => "graylist",
            ComponentKind::CompanyRules => "company_rules",
            ComponentKind::GlobalRules => "global_rules",
            ComponentKind::FamilyCompanyRules => "family_company_rules",
            ComponentKind::FamilyMccRules => "family_mcc_rules",
            ComponentKind::YellowFlag => "yellow_flag",
            ComponentKind::IdentityModule => "identity_module",
        }
    }

    /// The static list type this component checks, when it is list-like.
    pub const fn list_type(self) -> Option<ListType> {
        match self {
            ComponentKind::Whitelist => Some(ListType::White),
            ComponentKind::Blacklist => Some(ListType::Black),
            ComponentKind::Graylist => Some(ListType::Gray),
            _ => None,
        }
    }

    pub const fn is_list(self) -> bool {
        self.list_type().is_some()
    }
}

/// Console entry: a kind plus its priority policy. `priority[0]` is the
/// decision that may terminate the walk; an optional `priority[1]` is the
/// secondary ("else") decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub kind: ComponentKind,
    pub priority: Vec<Decision>,
}

impl Component {
    pub fn new(kind: ComponentKind, priority: Vec<Decision>) -> Self {
        Self { kind, priority }
    }

    pub fn primary(&self) -> Decision {
        self.priority.first().copied().unwrap_or_default()
    }

    pub fn secondary(&self) -> Option<Decision> {
        self.priority.get(1).copied()
    }
}

/// Static list membership classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    White,
    Black,
    Gray,
}

impl ListType {
    pub const fn label(self) -> &'static str {
        match self {
            ListType::White => "white",
            ListType::Black => "black",
            ListType::Gray => "gray",
        }
    }

    /// List entries arrive with free-form kind labels; entries that do not
    /// parse are skipped by the classifier rather than treated as fatal.
    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "white" => Some(ListType::White),
            "black" => Some(ListType::Black),
            "gray" | "grey" => Some(ListType::Gray),
            _ => None,
        }
    }
}

/// Static list record matched against a charge's search key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListEntry {
    pub id: String,
    pub kind: String,
    pub is_test: bool,
}

/// Scoped predicate configuration. The condition payload is opaque to the
/// decisioning core; only the predicate collaborator interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub company_id: Option<String>,
    pub family_id: Option<String>,
    pub family_company_id: Option<String>,
    pub condition: serde_json::Value,
    pub decision: Decision,
    pub is_global: bool,
    pub is_test: bool,
}

/// Card details captured on the inbound charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub card_brand: String,
    pub card_type: String,
    pub card_hash: String,
    pub last_four: String,
    pub issuer: String,
    pub country: String,
}

/// Payer identification used for list lookups and chargeback history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayerDetails {
    pub email: String,
    pub phone: String,
    pub document: Option<String>,
}

/// The subject of an evaluation, including its configured console.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    pub company_id: String,
    pub mcc: String,
    pub amount: u64,
    pub payment: PaymentDetails,
    pub payer: PayerDetails,
    pub market_segment: Option<String>,
    pub console: Vec<Component>,
}

impl Charge {
    /// Keys the static-list lookup; resolved once per evaluation.
    pub fn search_key(&self) -> SearchKey {
        SearchKey {
            email: self.payer.email.clone(),
            card_hash: self.payment.card_hash.clone(),
            phone: self.payer.phone.clone(),
            company_id: self.company_id.clone(),
        }
    }

    /// Flattened view handed to the opaque rule predicate, built once per
    /// evaluation. Enrichment values are layered on by the context.
    pub fn attributes(&self) -> ChargeAttributes {
        let mut attributes = BTreeMap::new();
        attributes.insert(
            "charge.company_id".to_string(),
            AttributeValue::Text(self.company_id.clone()),
        );
        attributes.insert(
            "charge.mcc".to_string(),
            AttributeValue::Text(self.mcc.clone()),
        );
        attributes.insert(
            "charge.amount".to_string(),
            AttributeValue::Number(self.amount as f64),
        );
        attributes.insert(
            "card.brand".to_string(),
            AttributeValue::Text(self.payment.card_brand.clone()),
        );
        attributes.insert(
            "card.type".to_string(),
            AttributeValue::Text(self.payment.card_type.clone()),
        );
        attributes.insert(
            "card.hash".to_string(),
            AttributeValue::Text(self.payment.card_hash.clone()),
        );
        attributes.insert(
            "card.last_four".to_string(),
            AttributeValue::Text(self.payment.last_four.clone()),
        );
        attributes.insert(
            "card.issuer".to_string(),
            AttributeValue::Text(self.payment.issuer.clone()),
        );
        attributes.insert(
            "card.country".to_string(),
            AttributeValue::Text(self.payment.country.clone()),
        );
        attributes.insert(
            "payer.email".to_string(),
            AttributeValue::Text(self.payer.email.clone()),
        );
        attributes.insert(
            "payer.phone".to_string(),
            AttributeValue::Text(self.payer.phone.clone()),
        );
        if let Some(document) = &self.payer.document {
            attributes.insert(
                "payer.document".to_string(),
                AttributeValue::Text(document.clone()),
            );
        }
        if let Some(segment) = &self.market_segment {
            attributes.insert(
                "charge.market_segment".to_string(),
                AttributeValue::Text(segment.clone()),
            );
        }
        attributes
    }
}

/// Lookup key for static lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchKey {
    pub email: String,
    pub card_hash: String,
    pub phone: String,
    pub company_id: String,
}

/// Value representation for a flattened charge attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Text(String),
    Number(f64),
    Flag(bool),
}

/// Flattened charge view consumed by the opaque rule predicate.
pub type ChargeAttributes = BTreeMap<String, AttributeValue>;

/// Scope of a candidate-rule fetch: company always, family scoping only for
/// the matching component kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleScope {
    pub kind: ComponentKind,
    pub company_id: String,
    pub family_id: Option<String>,
    pub family_company_ids: Vec<String>,
}

impl RuleScope {
    pub fn company(kind: ComponentKind, company_id: &str) -> Self {
        Self {
            kind,
            company_id: company_id.to_string(),
            family_id: None,
            family_company_ids: Vec::new(),
        }
    }
}

/// MCC family resolved for family-scoped rule components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Family {
    pub id: String,
    pub mccs: Vec<String>,
}

/// Group of companies evaluated under a shared rule set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyCompanies {
    pub id: String,
    pub company_ids: Vec<String>,
}

/// Filter for resolving a family from the charge's MCC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyFilter {
    pub mccs: Vec<String>,
    pub excluded_companies: Vec<String>,
}

/// Filter for resolving family-company groups from the charge's company.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FamilyCompaniesFilter {
    pub company_ids: Vec<String>,
}
