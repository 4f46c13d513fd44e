use super::domain::{AttributeValue, Charge, ChargeAttributes};

/// Neutral value substituted when a score lookup fails or is disabled.
pub const SCORE_SENTINEL: f64 = -1.0;

/// Derived state carried across the console walk. The charge itself is
/// never mutated; enrichment values and the sticky graylist flag live here,
/// and the attribute map is kept in sync so later rule predicates observe
/// them.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    attributes: ChargeAttributes,
    chargeback_count: u32,
    risk_score: f64,
    merchant_score: f64,
    graylisted: bool,
}

impl EvaluationContext {
    pub fn new(
        charge: &Charge,
        chargeback_count: u32,
        risk_score: f64,
        merchant_score: f64,
    ) -> Self {
        let mut attributes = charge.attributes();
        attributes.insert(
            "charge.chargebacks".to_string(),
            AttributeValue::Number(chargeback_count as f64),
        );
        attributes.insert(
            "charge.risk_score".to_string(),
            AttributeValue::Number(risk_score),
        );
        attributes.insert(
            "charge.merchant_score".to_string(),
            AttributeValue::Number(merchant_score),
        );
        attributes.insert(
            "charge.graylisted".to_string(),
            AttributeValue::Flag(false),
        );

        Self {
            attributes,
            chargeback_count,
            risk_score,
            merchant_score,
            graylisted: false,
        }
    }

    /// Mark the charge as graylisted. The flag is sticky for the remainder
    /// of the evaluation and is reflected into the attribute map.
    pub fn with_graylist(mut self) -> Self {
        self.graylisted = true;
        self.attributes.insert(
            "charge.graylisted".to_string(),
            AttributeValue::Flag(true),
        );
        self
    }

    pub fn attributes(&self) -> &ChargeAttributes {
        &self.attributes
    }

    pub fn chargeback_count(&self) -> u32 {
        self.chargeback_count
    }

    pub fn risk_score(&self) -> f64 {
        self.risk_score
    }

    pub fn merchant_score(&self) -> f64 {
        self.merchant_score
    }

    pub fn graylisted(&self) -> bool {
        self.graylisted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decisioning::domain::{Charge, PayerDetails, PaymentDetails};

    fn charge() -> Charge {
        Charge {
            company_id: "co-1".to_string(),
            mcc: "5812".to_string(),
            amount: 12_900,
            payment: PaymentDetails {
                card_brand: "visa".to_string(),
                card_type: "credit".to_string(),
                card_hash: "hash-1".to_string(),
                last_four: "4242".to_string(),
                issuer: "Acme Bank".to_string(),
                country: "BR".to_string(),
            },
            payer: PayerDetails {
                email: "payer@example.com".to_string(),
                phone: "+5511999990000".to_string(),
                document: None,
            },
            market_segment: None,
            console: Vec::new(),
        }
    }

    #[test]
    fn context_layers_enrichment_onto_attributes() {
        let context = EvaluationContext::new(&charge(), 3, 0.72, SCORE_SENTINEL);

        assert_eq!(context.chargeback_count(), 3);
        assert_eq!(
            context.attributes().get("charge.chargebacks"),
            Some(&AttributeValue::Number(3.0))
        );
        assert_eq!(
            context.attributes().get("charge.risk_score"),
            Some(&AttributeValue::Number(0.72))
        );
        assert_eq!(
            context.attributes().get("charge.graylisted"),
            Some(&AttributeValue::Flag(false))
        );
    }

    #[test]
    fn graylist_flag_is_visible_to_later_predicates() {
        let context = EvaluationContext::new(&charge(), 0, 0.1, 0.9).with_graylist();

        assert!(context.graylisted());
        assert_eq!(
            context.attributes().get("charge.graylisted"),
            Some(&AttributeValue::Flag(true))
        );
    }
}
