//! Caller authentication for signed calls.
//!
//! A [`SignedCall`] carries an ed25519 signature over
//!
//! ```text
//! CALL_SIGNING_DOMAIN || nonce (u64 LE) || calldata
//! ```
//!
//! The caller's [`Identity`] is derived from the public key, so the owner of
//! every order in the call is whoever holds the signing key. Nonces must
//! strictly increase per identity. A nonce is only consumed once the call
//! has committed; a rejected call can be resubmitted with the same nonce.

use std::collections::HashMap;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};

use pairbook_types::{Identity, PairbookError, Result, constants};

/// Calldata plus proof of who sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedCall {
    pub public_key: [u8; 32],
    pub nonce: u64,
    pub calldata: Vec<u8>,
    pub signature: Signature,
}

impl SignedCall {
    /// The bytes covered by the signature.
    #[must_use]
    pub fn signing_message(nonce: u64, calldata: &[u8]) -> Vec<u8> {
        let mut msg = Vec::with_capacity(constants::CALL_SIGNING_DOMAIN.len() + 8 + calldata.len());
        msg.extend_from_slice(constants::CALL_SIGNING_DOMAIN);
        msg.extend_from_slice(&nonce.to_le_bytes());
        msg.extend_from_slice(calldata);
        msg
    }

    /// Identity bound to the signing key.
    #[must_use]
    pub fn caller(&self) -> Identity {
        Identity::from_public_key(&self.public_key)
    }

    /// Check the signature. Does not look at the nonce history.
    pub fn verify_signature(&self) -> Result<Identity> {
        let key = VerifyingKey::from_bytes(&self.public_key)
            .map_err(|_| PairbookError::SignatureInvalid)?;
        key.verify(
            &Self::signing_message(self.nonce, &self.calldata),
            &self.signature,
        )
        .map_err(|_| PairbookError::SignatureInvalid)?;
        Ok(self.caller())
    }
}

/// Test helpers.
#[cfg(any(test, feature = "test-helpers"))]
impl SignedCall {
    pub fn sign(key: &ed25519_dalek::SigningKey, nonce: u64, calldata: Vec<u8>) -> Self {
        use ed25519_dalek::Signer;

        let signature = key.sign(&Self::signing_message(nonce, &calldata));
        Self {
            public_key: key.verifying_key().to_bytes(),
            nonce,
            calldata,
            signature,
        }
    }
}

/// Tracks the last committed nonce of every identity.
#[derive(Debug, Default, Clone)]
pub struct CallAuthenticator {
    last_nonce: HashMap<Identity, u64>,
}

impl CallAuthenticator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify the signature and that the nonce is fresh.
    ///
    /// Returns the authenticated caller. The nonce is not consumed; call
    /// [`consume`](Self::consume) after the call commits.
    pub fn authenticate(&self, call: &SignedCall) -> Result<Identity> {
        let caller = call.verify_signature()?;
        match self.last_nonce.get(&caller) {
            Some(&last) if call.nonce <= last => Err(PairbookError::NonceReplay {
                caller,
                nonce: call.nonce,
                last,
            }),
            _ => Ok(caller),
        }
    }

    /// Record `nonce` as the latest one used by `caller`.
    pub fn consume(&mut self, caller: Identity, nonce: u64) {
        let last = self.last_nonce.entry(caller).or_insert(nonce);
        *last = (*last).max(nonce);
    }

    #[must_use]
    pub fn last_nonce(&self, caller: &Identity) -> Option<u64> {
        self.last_nonce.get(caller).copied()
    }
}
