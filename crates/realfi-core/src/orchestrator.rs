//! Multi-contract deployment sequences.
//!
//! A factory deployment runs in a fixed order: the stable token, the KYC
//! registry and the vault factory, then for each neighborhood a share token,
//! a factory-created vault and the link between them. Every transaction is
//! sent with a nonce from one [`NonceSequencer`] and waits for its receipt
//! before the next is built, so nonces are consecutive and the dependency
//! order holds on chain.

use crate::addresses::{AddressMap, AddressStore, FactoryAddresses, VaultEntry};
use crate::artifact::ArtifactSet;
use crate::chain::ChainClient;
use crate::compiler::{compile_all, Compiler};
use crate::contracts::{
    self, decode_return, IDongVaultFactory, IVToken, DEFAULT_TARGET_AMOUNT, DONG_VAULT_FACTORY,
    FACTORY_CONTRACTS, KYC_REGISTRY, NEIGHBORHOOD_CONTRACTS, USDT0, VTOKEN,
};
use crate::deploy::{Deployer, DeploymentRecord};
use crate::error::{RealfiError, Result};
use crate::neighborhood::{ensure_unique, Neighborhood};
use crate::network::Network;
use crate::nonce::NonceSequencer;
use crate::receipt::ReceiptPolicy;
use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;
use serde::Serialize;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Preflight
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentKind {
    /// Core contracts plus a vault per neighborhood.
    Factory,
    /// One contract on its own.
    Single,
}

impl DeploymentKind {
    /// Minimum signer balance in wei: 0.05 and 0.001 native units.
    pub fn min_balance(&self) -> U256 {
        match self {
            DeploymentKind::Factory => U256::from(50_000_000_000_000_000u64),
            DeploymentKind::Single => U256::from(1_000_000_000_000_000u64),
        }
    }
}

/// Fail unless the signer can cover a deployment of `kind`. Returns the
/// balance that was checked.
pub fn preflight<C: ChainClient + ?Sized>(chain: &C, kind: DeploymentKind) -> Result<U256> {
    let available = chain.balance(chain.signer())?;
    let required = kind.min_balance();
    if available < required {
        return Err(RealfiError::InsufficientFunds {
            required,
            available,
        });
    }
    Ok(available)
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Outcome of a full factory deployment.
#[derive(Debug, Clone, Serialize)]
pub struct FactoryDeployment {
    pub addresses: FactoryAddresses,
    pub core: Vec<DeploymentRecord>,
    pub nonces_issued: u64,
}

pub struct Orchestrator<'c, C: ChainClient + ?Sized> {
    deployer: Deployer<'c, C>,
    network: Network,
}

impl<'c, C: ChainClient + ?Sized> Orchestrator<'c, C> {
    pub fn new(chain: &'c C, policy: ReceiptPolicy, network: Network) -> Self {
        Self {
            deployer: Deployer::new(chain, policy),
            network,
        }
    }

    pub fn chain(&self) -> &'c C {
        self.deployer.chain()
    }

    /// Deploy the whole factory system and overwrite the address record.
    ///
    /// A failure inside the neighborhood loop is returned as
    /// [`RealfiError::PartialDeployment`] after the completed prefix has been
    /// written to the sidecar file; the main record is not touched. Nothing is
    /// rolled back on chain.
    pub fn deploy_factory_system<P: Compiler + ?Sized>(
        &self,
        compiler: &P,
        store: &AddressStore,
        nonces: &mut NonceSequencer<'c, C>,
        neighborhoods: &[Neighborhood],
    ) -> Result<FactoryDeployment> {
        ensure_unique(neighborhoods)?;
        let balance = preflight(self.chain(), DeploymentKind::Factory)?;
        info!(
            network = %self.network,
            deployer = %self.chain().signer(),
            %balance,
            neighborhoods = neighborhoods.len(),
            "starting factory deployment"
        );

        nonces.reset();
        let artifacts = compile_all(compiler, &FACTORY_CONTRACTS)?;

        let mut core = Vec::with_capacity(3);
        let deployed = self.deploy_core(&artifacts, nonces, &mut core);
        if let Err(e) = deployed {
            for record in &core {
                warn!(contract = %record.contract, address = %record.address, "deployed before abort");
            }
            return Err(e);
        }
        let factory = core[2].address;

        let mut record =
            FactoryAddresses::new(self.network, core[0].address, core[1].address, factory);

        for neighborhood in neighborhoods {
            match self.wire_neighborhood(&artifacts, factory, nonces, neighborhood) {
                Ok(entry) => {
                    record.neighborhoods.insert(neighborhood.name.clone(), entry);
                }
                Err(source) => {
                    if let Err(e) = store.save_partial(&record) {
                        warn!("could not write partial record: {e}");
                    }
                    return Err(RealfiError::PartialDeployment {
                        completed: Box::new(record),
                        source: Box::new(source),
                    });
                }
            }
        }

        store.save(&AddressMap::Factory(record.clone()))?;
        match store.clear_partial() {
            Ok(true) => info!("removed stale partial record"),
            Ok(false) => {}
            Err(e) => warn!("could not remove stale partial record: {e}"),
        }
        info!(nonces = nonces.issued(), "factory deployment complete");

        Ok(FactoryDeployment {
            addresses: record,
            core,
            nonces_issued: nonces.issued(),
        })
    }

    /// Add one neighborhood to an existing factory deployment and merge it
    /// into the record.
    pub fn add_neighborhood<P: Compiler + ?Sized>(
        &self,
        compiler: &P,
        store: &AddressStore,
        nonces: &mut NonceSequencer<'c, C>,
        neighborhood: &Neighborhood,
    ) -> Result<VaultEntry> {
        let record = store.load_factory()?;
        if record.network != self.network {
            return Err(RealfiError::Config(format!(
                "address record is for {}, not {}",
                record.network, self.network
            )));
        }
        if record.neighborhoods.contains_key(&neighborhood.name) {
            return Err(RealfiError::NeighborhoodExists(neighborhood.name.clone()));
        }

        nonces.reset();
        let artifacts = compile_all(compiler, &NEIGHBORHOOD_CONTRACTS)?;
        let entry =
            self.wire_neighborhood(&artifacts, record.vault_factory, nonces, neighborhood)?;
        store.add_neighborhood(&neighborhood.name, entry.clone())?;
        Ok(entry)
    }

    /// Deploy a single contract without a managed nonce. Nothing is recorded.
    pub fn deploy_single<P: Compiler + ?Sized>(
        &self,
        compiler: &P,
        contract: &str,
        constructor_args: &[u8],
    ) -> Result<DeploymentRecord> {
        preflight(self.chain(), DeploymentKind::Single)?;
        let artifact = compiler.compile(contract)?;
        self.deployer.deploy(&artifact, constructor_args, None)
    }

    // USDT0 -> KYCRegistry -> DongVaultFactory(usdt0, kyc); records are
    // pushed as they are mined
    fn deploy_core(
        &self,
        artifacts: &ArtifactSet,
        nonces: &mut NonceSequencer<'c, C>,
        core: &mut Vec<DeploymentRecord>,
    ) -> Result<()> {
        core.push(
            self.deployer
                .deploy(artifacts.get(USDT0)?, &[], Some(nonces.next()?))?,
        );
        core.push(
            self.deployer
                .deploy(artifacts.get(KYC_REGISTRY)?, &[], Some(nonces.next()?))?,
        );
        let args = contracts::factory_constructor_args(core[0].address, core[1].address);
        core.push(self.deployer.deploy(
            artifacts.get(DONG_VAULT_FACTORY)?,
            &args,
            Some(nonces.next()?),
        )?);
        Ok(())
    }

    // share token -> createVault -> getVault -> setVault
    fn wire_neighborhood(
        &self,
        artifacts: &ArtifactSet,
        factory: Address,
        nonces: &mut NonceSequencer<'c, C>,
        neighborhood: &Neighborhood,
    ) -> Result<VaultEntry> {
        let name = neighborhood.name.as_str();
        info!(neighborhood = name, gu = %neighborhood.gu, "creating vault");

        let share_token = self.deployer.deploy(
            artifacts.get(VTOKEN)?,
            &contracts::vtoken_constructor_args(name),
            Some(nonces.next()?),
        )?;

        let create = IDongVaultFactory::createVaultCall {
            dongName: name.to_string(),
            gu: neighborhood.gu.clone(),
            vToken: share_token.address,
            targetAmount: U256::from(DEFAULT_TARGET_AMOUNT),
        };
        self.deployer
            .send(factory, create.abi_encode(), Some(nonces.next()?), "createVault")?;

        let lookup = IDongVaultFactory::getVaultCall {
            dongName: name.to_string(),
        };
        let raw = self.deployer.read(factory, lookup.abi_encode())?;
        let vault = decode_return::<IDongVaultFactory::getVaultCall>(&raw)?._0;
        if vault == Address::ZERO {
            return Err(RealfiError::ChainQuery(format!(
                "factory {factory} has no vault registered for {name}"
            )));
        }

        let link = IVToken::setVaultCall { vault };
        self.deployer.send(
            share_token.address,
            link.abi_encode(),
            Some(nonces.next()?),
            "setVault",
        )?;

        info!(neighborhood = name, %vault, share_token = %share_token.address, "vault linked");
        Ok(VaultEntry {
            vault,
            share_token: share_token.address,
            gu: neighborhood.gu.clone(),
        })
    }
}
