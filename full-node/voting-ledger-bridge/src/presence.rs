use tracing::{debug, error};

use crate::error::REDEPLOY_HINT;
use crate::{BridgeError, BridgeResult, LedgerAddress, LedgerClient};

/// Fails with [`BridgeError::NotDeployed`] unless code exists at `address`.
///
/// Transport failures pass through as [`BridgeError::Connection`].
pub async fn ensure_deployed<L: LedgerClient + ?Sized>(
    client: &L,
    address: LedgerAddress,
) -> BridgeResult<()> {
    let code = client.get_code(address).await?;
    if code.is_empty() {
        error!(%address, "No contract deployed at configured address");
        return Err(BridgeError::NotDeployed {
            address,
            remediation: REDEPLOY_HINT,
        });
    }

    debug!(%address, code_len = code.len(), "Contract found");
    Ok(())
}
