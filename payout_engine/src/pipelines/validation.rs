use once_cell::sync::Lazy;
use payout_common::Amount;
use regex::Regex;

use crate::{
    config::EngineConfig,
    db_types::{Proof, ProofKind},
    pipelines::ValidationError,
};

static WALLET_ADDRESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.\-]+$").expect("Wallet address pattern must compile"));
static REFERENCE_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(https?://|t\.me/|@)\S+$").expect("Reference link pattern must compile"));

/// Input validation rules for the guided flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationRules {
    pub wallet_min_length: usize,
    pub wallet_max_length: usize,
    pub max_valuation: Amount,
}

impl Default for ValidationRules {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for ValidationRules {
    fn from(config: &EngineConfig) -> Self {
        Self {
            wallet_min_length: config.wallet_min_length,
            wallet_max_length: config.wallet_max_length,
            max_valuation: config.max_valuation,
        }
    }
}

impl ValidationRules {
    /// Wallet addresses are `[A-Za-z0-9_.-]` strings within the configured length bounds. Surrounding whitespace is
    /// ignored.
    pub fn wallet_address(&self, text: &str) -> Result<String, ValidationError> {
        let address = text.trim();
        let len = address.chars().count();
        if WALLET_ADDRESS.is_match(address) && (self.wallet_min_length..=self.wallet_max_length).contains(&len) {
            Ok(address.to_string())
        } else {
            Err(ValidationError::InvalidWalletAddress(address.to_string()))
        }
    }

    /// Reference links must start with `http://`, `https://`, `t.me/` or `@`, have something after the prefix and
    /// contain no whitespace.
    pub fn reference_link(&self, text: &str) -> Result<String, ValidationError> {
        let link = text.trim();
        if REFERENCE_LINK.is_match(link) {
            Ok(link.to_string())
        } else {
            Err(ValidationError::InvalidReferenceLink(link.to_string()))
        }
    }

    /// Amounts must be positive and no larger than the configured maximum.
    pub fn amount(&self, text: &str) -> Result<Amount, ValidationError> {
        let amount = text.parse::<Amount>().map_err(|e| ValidationError::InvalidAmount(e.to_string()))?;
        if !amount.is_positive() {
            return Err(ValidationError::InvalidAmount(format!("{amount} is not a positive amount.")));
        }
        if amount > self.max_valuation {
            return Err(ValidationError::InvalidAmount(format!(
                "{amount} is larger than the maximum of {}.",
                self.max_valuation
            )));
        }
        Ok(amount)
    }

    pub fn rejection_reason(&self, text: &str) -> Result<String, ValidationError> {
        let reason = text.trim();
        if reason.is_empty() {
            Err(ValidationError::EmptyReason)
        } else {
            Ok(reason.to_string())
        }
    }

    /// Payment receipts must be a photo or a document.
    pub fn payment_proof(&self, proof: Proof) -> Result<Proof, ValidationError> {
        match proof.kind {
            ProofKind::Photo | ProofKind::Document => Ok(proof),
            kind => Err(ValidationError::WrongAttachment(kind)),
        }
    }
}
