use std::fmt::Debug;

use ethers_core::types::Address;
use ethers_signers::{LocalWallet, Signer};

use crate::{BridgeError, BridgeResult};

/// Value the deployment script writes when no key was available.
pub(crate) const CREDENTIAL_PLACEHOLDER: &str = "your_private_key_here";

/// Secret key material supplied by a voter.
///
/// Intentionally neither `Serialize` nor `Display`; `Debug` is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningCredential(String);

impl SigningCredential {
    /// Wraps raw key material. Surrounding whitespace is trimmed.
    pub fn new(secret: impl AsRef<str>) -> Self {
        Self(secret.as_ref().trim().to_string())
    }

    /// Like [`SigningCredential::new`], but treats empty input and the
    /// deployment script placeholder as "no credential".
    pub fn from_optional(secret: &str) -> Option<Self> {
        let secret = secret.trim();
        if secret.is_empty() || secret == CREDENTIAL_PLACEHOLDER {
            None
        } else {
            Some(Self::new(secret))
        }
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl Debug for SigningCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningCredential(<redacted>)")
    }
}

/// A signer derived from a [`SigningCredential`].
#[derive(Clone, Debug)]
pub struct SigningIdentity {
    wallet: LocalWallet,
}

impl SigningIdentity {
    /// Derives the secp256k1 signer behind `credential`.
    /// Accepts 32-byte hex keys with or without a `0x` prefix.
    pub fn derive(credential: &SigningCredential) -> BridgeResult<Self> {
        let wallet = credential
            .expose()
            .parse::<LocalWallet>()
            .map_err(|e| BridgeError::Signing(e.to_string()))?;
        Ok(Self { wallet })
    }

    /// Address transactions will be sent from.
    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    /// Wallet bound to `chain_id`, ready to sign.
    pub fn wallet_for_chain(&self, chain_id: u64) -> LocalWallet {
        self.wallet.clone().with_chain_id(chain_id)
    }
}
