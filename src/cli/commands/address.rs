use crate::codec::derive_multisig_account_id;
use crate::errors::AppResult;
use crate::types::AccountId;
use clap::Args;
use tracing::info;

#[derive(Args)]
pub struct DeriveAddressCommand {
    /// Signatory account id (0x hex); repeat for each signatory
    #[arg(long = "signatory", required = true)]
    signatories: Vec<String>,

    /// Approvals required to execute
    #[arg(long)]
    threshold: u16,
}

impl DeriveAddressCommand {
    pub fn run(&self) -> AppResult<()> {
        let signatories = self
            .signatories
            .iter()
            .map(|raw| raw.parse::<AccountId>())
            .collect::<Result<Vec<_>, _>>()?;

        let account_id = derive_multisig_account_id(&signatories, self.threshold)?;
        info!(
            "Derived multisig from {} signatories, threshold {}",
            signatories.len(),
            self.threshold
        );

        println!("Account id: {}", account_id);
        println!("Address:    {}", account_id.to_address());
        Ok(())
    }
}
