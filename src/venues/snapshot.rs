// Snapshot venue
// In-memory registry and liquidity pool backed by a YAML snapshot. Used by
// the demo binary for dry runs and by the test suite as a deterministic venue
//
// Numan Thabit 2025 Nov

use crate::errors::VenueError;
use crate::router::routes::hop_output;
use crate::venues::adapter::{Account, Pool, Ratio, Registry, Token, TxId};
use anyhow::{Context, Result};
use blake2::{Blake2b512, Digest};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// On-disk snapshot layout.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotFile {
    /// Pool contract account; holds swap output between hops.
    pub pool: Account,
    pub swap_fee_bps: u32,
    /// Supported tokens in registry order.
    pub tokens: Vec<TokenEntry>,
    /// Token balances of external accounts.
    #[serde(default)]
    pub accounts: HashMap<Account, HashMap<Token, u64>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenEntry {
    pub address: Token,
    /// Oracle price; missing means the price feed is down for this token.
    #[serde(default)]
    pub price: Option<PriceEntry>,
    #[serde(default)]
    pub min_liquidity: u64,
    /// Pool reserve of this token.
    #[serde(default)]
    pub reserve: u64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PriceEntry {
    pub num: u64,
    #[serde(default = "one")]
    pub den: u64,
}

fn one() -> u64 {
    1
}

#[derive(Debug, Clone)]
struct TokenState {
    price: Option<Ratio>,
    min_liquidity: u128,
    reserve: u128,
}

#[derive(Debug, Default)]
struct VenueState {
    order: Vec<Token>,
    tokens: HashMap<Token, TokenState>,
    balances: HashMap<Account, HashMap<Token, u128>>,
    swap_fee_bps: u32,
    tx_seq: u64,
}

impl VenueState {
    fn token(&self, token: &Token) -> Result<&TokenState, VenueError> {
        self.tokens
            .get(token)
            .ok_or_else(|| VenueError::UnknownToken(token.clone()))
    }

    fn token_mut(&mut self, token: &Token) -> Result<&mut TokenState, VenueError> {
        self.tokens
            .get_mut(token)
            .ok_or_else(|| VenueError::UnknownToken(token.clone()))
    }

    fn price(&self, token: &Token) -> Result<Ratio, VenueError> {
        self.token(token)?
            .price
            .ok_or_else(|| VenueError::Unavailable(format!("no price for {token}")))
    }

    fn balance_of(&self, account: &Account, token: &Token) -> u128 {
        self.balances
            .get(account)
            .and_then(|held| held.get(token))
            .copied()
            .unwrap_or_default()
    }

    fn debit(&mut self, account: &Account, token: &Token, amount: u128) -> Result<(), VenueError> {
        let available = self.balance_of(account, token);
        if available < amount {
            return Err(VenueError::InsufficientBalance {
                token: token.clone(),
                needed: amount,
                available,
            });
        }
        self.balances
            .entry(account.clone())
            .or_default()
            .insert(token.clone(), available - amount);
        Ok(())
    }

    fn credit(&mut self, account: &Account, token: &Token, amount: u128) {
        *self
            .balances
            .entry(account.clone())
            .or_default()
            .entry(token.clone())
            .or_default() += amount;
    }

    fn next_tx_id(&mut self, parts: &[&[u8]]) -> TxId {
        self.tx_seq += 1;
        let mut hasher = Blake2b512::new();
        hasher.update(self.tx_seq.to_le_bytes());
        for part in parts {
            hasher.update(part);
        }
        let hash = hasher.finalize();
        TxId::new(format!("0x{}", hex::encode(&hash[..32])))
    }
}

/// Registry + pool over in-memory state.
///
/// Swap output stays in pool custody: after a confirmed swap the pool
/// account is the holder that must fund the next hop or the payout.
pub struct SnapshotVenue {
    pool_account: Account,
    state: RwLock<VenueState>,
}

impl SnapshotVenue {
    pub fn from_file(snapshot: SnapshotFile) -> Self {
        let mut state = VenueState {
            swap_fee_bps: snapshot.swap_fee_bps,
            ..Default::default()
        };
        for entry in snapshot.tokens {
            let price = entry
                .price
                .and_then(|p| Ratio::new(p.num as u128, p.den as u128));
            state.order.push(entry.address.clone());
            state.tokens.insert(
                entry.address,
                TokenState {
                    price,
                    min_liquidity: entry.min_liquidity as u128,
                    reserve: entry.reserve as u128,
                },
            );
        }
        for (account, held) in snapshot.accounts {
            for (token, amount) in held {
                state.credit(&account, &token, amount as u128);
            }
        }
        Self {
            pool_account: snapshot.pool,
            state: RwLock::new(state),
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let snapshot: SnapshotFile =
            serde_yaml::from_str(yaml).context("parse venue snapshot")?;
        Ok(Self::from_file(snapshot))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read venue snapshot {}", path.display()))?;
        let venue = Self::from_yaml(&raw)?;
        info!(path = %path.display(), pool = %venue.pool_account, "loaded venue snapshot");
        Ok(venue)
    }

    pub fn pool_account(&self) -> &Account {
        &self.pool_account
    }

    /// Moves the oracle price of `token`; `None` takes its feed offline.
    pub async fn set_price(&self, token: &Token, price: Option<Ratio>) -> Result<(), VenueError> {
        self.state.write().await.token_mut(token)?.price = price;
        Ok(())
    }

    pub async fn set_reserve(&self, token: &Token, reserve: u128) -> Result<(), VenueError> {
        self.state.write().await.token_mut(token)?.reserve = reserve;
        Ok(())
    }

    pub async fn account_balance(&self, account: &Account, token: &Token) -> u128 {
        self.state.read().await.balance_of(account, token)
    }
}

impl Registry for SnapshotVenue {
    async fn supported_tokens(&self) -> Result<Vec<Token>, VenueError> {
        Ok(self.state.read().await.order.clone())
    }

    async fn min_liquidity(&self, token: &Token) -> Result<u128, VenueError> {
        Ok(self.state.read().await.token(token)?.min_liquidity)
    }

    async fn price(&self, token: &Token) -> Result<Ratio, VenueError> {
        self.state.read().await.price(token)
    }
}

impl Pool for SnapshotVenue {
    async fn balance(&self, token: &Token) -> Result<u128, VenueError> {
        Ok(self.state.read().await.token(token)?.reserve)
    }

    async fn swap_fee_bps(&self) -> Result<u32, VenueError> {
        Ok(self.state.read().await.swap_fee_bps)
    }

    async fn swap(
        &self,
        holder: &Account,
        from: &Token,
        to: &Token,
        amount: u128,
        min_out: u128,
    ) -> Result<TxId, VenueError> {
        let mut state = self.state.write().await;
        let weight = state
            .price(from)?
            .div(&state.price(to)?)
            .ok_or_else(|| VenueError::Reverted("price ratio overflow".into()))?;
        let (fee, realized) = hop_output(amount, state.swap_fee_bps, &weight)
            .ok_or_else(|| VenueError::Reverted("swap amount overflow".into()))?;

        if realized < min_out {
            return Err(VenueError::SlippageExceeded { min_out, realized });
        }
        let reserve_out = state.token(to)?.reserve;
        if reserve_out < realized {
            return Err(VenueError::InsufficientLiquidity {
                token: to.clone(),
                needed: realized,
                available: reserve_out,
            });
        }

        // input already in custody when the pool itself is the holder
        if holder != &self.pool_account {
            state.debit(holder, from, amount)?;
            state.token_mut(from)?.reserve += amount;
        }

        let tx = state.next_tx_id(&[
            b"swap".as_slice(),
            holder.as_str().as_bytes(),
            from.as_str().as_bytes(),
            to.as_str().as_bytes(),
            amount.to_le_bytes().as_slice(),
        ]);
        debug!(holder = %holder, from = %from, to = %to, amount_in = amount, fee = fee, amount_out = realized, tx = %tx, "snapshot swap");
        Ok(tx)
    }

    async fn transfer(
        &self,
        holder: &Account,
        token: &Token,
        recipient: &Account,
        amount: u128,
    ) -> Result<TxId, VenueError> {
        let mut state = self.state.write().await;
        if holder == &self.pool_account {
            let reserve = state.token(token)?.reserve;
            if reserve < amount {
                return Err(VenueError::InsufficientLiquidity {
                    token: token.clone(),
                    needed: amount,
                    available: reserve,
                });
            }
            state.token_mut(token)?.reserve = reserve - amount;
        } else {
            state.token(token)?;
            state.debit(holder, token, amount)?;
        }
        state.credit(recipient, token, amount);

        let tx = state.next_tx_id(&[
            b"transfer".as_slice(),
            holder.as_str().as_bytes(),
            token.as_str().as_bytes(),
            recipient.as_str().as_bytes(),
            amount.to_le_bytes().as_slice(),
        ]);
        debug!(holder = %holder, token = %token, recipient = %recipient, amount = amount, tx = %tx, "snapshot transfer");
        Ok(tx)
    }

    fn holder_after_swap(&self, _prior: &Account) -> Account {
        self.pool_account.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YAML: &str = r#"
pool: "0xpool"
swap_fee_bps: 30
tokens:
  - address: USDC
    price: { num: 100000000 }
    min_liquidity: 1000
    reserve: 50000
  - address: DAI
    price: { num: 99990000 }
    min_liquidity: 1000
    reserve: 50000
  - address: USDT
    min_liquidity: 1000
    reserve: 50000
accounts:
  alice:
    USDC: 20000
"#;

    #[tokio::test]
    async fn loads_yaml_in_registry_order() {
        let venue = SnapshotVenue::from_yaml(YAML).unwrap();
        let tokens = venue.supported_tokens().await.unwrap();
        assert_eq!(
            tokens,
            vec![Token::new("USDC"), Token::new("DAI"), Token::new("USDT")]
        );
        assert_eq!(venue.swap_fee_bps().await.unwrap(), 30);
        assert_eq!(venue.balance(&Token::new("DAI")).await.unwrap(), 50_000);
        assert!(matches!(
            venue.price(&Token::new("USDT")).await,
            Err(VenueError::Unavailable(_))
        ));
        assert!(matches!(
            venue.min_liquidity(&Token::new("EURC")).await,
            Err(VenueError::UnknownToken(_))
        ));
    }

    #[tokio::test]
    async fn swap_then_payout_moves_funds() {
        let venue = SnapshotVenue::from_yaml(YAML).unwrap();
        let alice = Account::new("alice");
        let bob = Account::new("bob");
        let (usdc, dai) = (Token::new("USDC"), Token::new("DAI"));

        let tx = venue.swap(&alice, &usdc, &dai, 10_000, 0).await.unwrap();
        assert!(tx.as_str().starts_with("0x") && tx.as_str().len() == 66);
        assert_eq!(venue.account_balance(&alice, &usdc).await, 10_000);
        assert_eq!(venue.balance(&usdc).await.unwrap(), 60_000);
        assert_eq!(venue.holder_after_swap(&alice), Account::new("0xpool"));

        venue
            .transfer(venue.pool_account(), &dai, &bob, 9_000)
            .await
            .unwrap();
        assert_eq!(venue.account_balance(&bob, &dai).await, 9_000);
        assert_eq!(venue.balance(&dai).await.unwrap(), 41_000);
    }

    #[tokio::test]
    async fn swap_rejects_output_below_minimum() {
        let venue = SnapshotVenue::from_yaml(YAML).unwrap();
        let err = venue
            .swap(
                &Account::new("alice"),
                &Token::new("USDC"),
                &Token::new("DAI"),
                10_000,
                u128::MAX,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VenueError::SlippageExceeded { .. }));
        // nothing debited on rejection
        assert_eq!(
            venue
                .account_balance(&Account::new("alice"), &Token::new("USDC"))
                .await,
            20_000
        );
    }

    #[tokio::test]
    async fn swap_needs_holder_funds() {
        let venue = SnapshotVenue::from_yaml(YAML).unwrap();
        let err = venue
            .swap(
                &Account::new("carol"),
                &Token::new("USDC"),
                &Token::new("DAI"),
                10,
                0,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VenueError::InsufficientBalance { .. }));
    }
}
