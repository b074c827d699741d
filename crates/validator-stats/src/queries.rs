//! GraphQL documents sent to the Chainflip indexers and the shapes of their
//! responses.

use serde::Deserialize;
use serde_json::Value;

use crate::amount::{integer, tokens};

/// Latest epoch with the bids, rewards and versions of its authorities.
pub const ACTIVE_AUTHORITY_INFO: &str = r"
query ActiveAuthorityInfo {
  epoch: allEpoches(first: 1, orderBy: ID_DESC) {
    nodes {
      id
      startBlockId
      endBlockId
      memberships: authorityMembershipsByEpochId(orderBy: BID_DESC) {
        nodes {
          bid
          reward
          validator: validatorByValidatorId {
            cfeVersion: cfeVersionId
            account: accountByAccountId {
              idSs58
            }
          }
        }
      }
    }
  }
}
";

/// Indexer account of a validator, with its own reported version.
pub const VALIDATOR_ACCOUNT: &str = r"
query ValidatorAccount($idSs58: String!) {
  accounts: allAccounts(condition: {idSs58: $idSs58}) {
    nodes {
      id
      idSs58
      validators: validatorsByAccountId {
        nodes {
          id
          cfeVersion: cfeVersionId
        }
      }
    }
  }
}
";

/// Minimum bid of the latest auction.
pub const LATEST_AUCTION: &str = r"
query LatestAuction {
  auction: auctionById(id: 1) {
    minActiveBid
  }
}
";

/// Penalties applied after a given block.
pub const PENALTIES: &str = r"
query Penalties($first: Int, $after: Cursor, $startBlockId: Int) {
  penalties: allPenalties(
    first: $first
    after: $after
    orderBy: ID_ASC
    filter: {blockId: {greaterThan: $startBlockId}}
  ) {
    pageInfo {
      hasNextPage
      endCursor
    }
    edges {
      node {
        amount
        reason
        blockId
        validator: validatorByValidatorId {
          account: accountByAccountId {
            idSs58
          }
        }
      }
    }
  }
}
";

/// Extrinsics submitted by an account within a block range.
pub const EXTRINSICS_BY_ACCOUNT: &str = r"
query ExtrinsicsByAccount($accountId: Int, $first: Int, $after: Cursor, $minBlock: Int, $maxBlock: Int) {
  extrinsics: allExtrinsics(
    condition: {submitterId: $accountId}
    filter: {blockId: {greaterThanOrEqualTo: $minBlock, lessThanOrEqualTo: $maxBlock}}
    orderBy: ID_DESC
    first: $first
    after: $after
  ) {
    pageInfo {
      hasNextPage
      endCursor
    }
    edges {
      node {
        blockId
        success
        args
      }
    }
  }
}
";

/// Every validator known to the cache.
pub const VALIDATORS: &str = r"
query Validators {
  validators: allValidators {
    nodes {
      ...CacheValidator
    }
  }
}

fragment CacheValidator on Validator {
  idSs58
  alias
  totalRewards
  isCurrentAuthority
  isCurrentBackup
  isQualified
  isOnline
  isBidding
  isKeyholder
  reputationPoints
  lockedBalance
  unlockedBalance
}
";

/// A single validator from the cache.
pub const VALIDATOR_BY_ID: &str = r"
query ValidatorByIdSs58($idSs58: String!) {
  validators: allValidators(condition: {idSs58: $idSs58}) {
    nodes {
      ...CacheValidator
    }
  }
}

fragment CacheValidator on Validator {
  idSs58
  alias
  totalRewards
  isCurrentAuthority
  isCurrentBackup
  isQualified
  isOnline
  isBidding
  isKeyholder
  reputationPoints
  lockedBalance
  unlockedBalance
}
";

/// Records of a PostGraphile list field.
#[derive(Debug, Deserialize)]
pub struct Nodes<T> {
    /// The records
    pub nodes: Vec<T>,
}

/// Relay-style connection, paginated by cursor.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    /// Cursor state
    pub page_info: PageInfo,

    /// The records of this page
    pub edges: Vec<Edge<T>>,
}

/// Cursor state of a [`Connection`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether another page follows
    pub has_next_page: bool,

    /// Cursor to pass as `after` for the next page
    #[serde(default)]
    pub end_cursor: Option<String>,
}

/// Wrapper of a single record in a [`Connection`].
#[derive(Debug, Deserialize)]
pub struct Edge<T> {
    /// The record
    pub node: T,
}

/// Response of [`ACTIVE_AUTHORITY_INFO`].
#[derive(Debug, Deserialize)]
pub struct AuthorityInfo {
    /// The latest epoch, alone in its list
    pub epoch: Nodes<Epoch>,
}

/// An epoch and its authorities.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epoch {
    /// Epoch index
    pub id: u64,

    /// Last block of the epoch, unset while it is running
    #[serde(default)]
    pub end_block_id: Option<u64>,

    /// Authority seats of the epoch
    pub memberships: Nodes<Membership>,
}

/// An authority's seat in an epoch.
#[derive(Debug, Deserialize)]
pub struct Membership {
    /// Winning bid, in whole tokens
    #[serde(deserialize_with = "tokens")]
    pub bid: f64,

    /// Rewards earned in the epoch, in whole tokens
    #[serde(default, deserialize_with = "tokens")]
    pub reward: f64,

    /// The authority
    pub validator: MembershipValidator,
}

/// Validator side of a [`Membership`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipValidator {
    /// Version of the engine the validator last reported
    #[serde(default)]
    pub cfe_version: Option<String>,

    /// Owning account
    pub account: AccountRef,
}

/// An account, referenced by address.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRef {
    /// SS58 address
    pub id_ss58: String,
}

/// Response of [`VALIDATOR_ACCOUNT`].
#[derive(Debug, Deserialize)]
pub struct AccountInfo {
    /// Matching accounts, at most one
    pub accounts: Nodes<Account>,
}

/// Indexer account of a validator.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Indexer row id, used to filter extrinsics by submitter
    pub id: i64,

    /// SS58 address
    pub id_ss58: String,

    /// Validator records of the account
    pub validators: Nodes<AccountValidator>,
}

/// Validator record of an [`Account`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountValidator {
    /// Indexer row id
    pub id: i64,

    /// Version of the engine the validator last reported
    #[serde(default)]
    pub cfe_version: Option<String>,
}

/// Response of [`LATEST_AUCTION`].
#[derive(Debug, Deserialize)]
pub struct AuctionInfo {
    /// The auction, if one was indexed
    pub auction: Option<Auction>,
}

/// Auction parameters.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Auction {
    /// Lowest bid that wins a seat, in whole tokens
    #[serde(deserialize_with = "tokens")]
    pub min_active_bid: f64,
}

/// A penalty record of [`PENALTIES`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Penalty {
    /// Reputation points deducted
    #[serde(deserialize_with = "integer")]
    pub amount: i64,

    /// Offence
    pub reason: String,

    /// Block the penalty was applied in
    pub block_id: u64,

    /// Penalized validator
    pub validator: PenalizedValidator,
}

/// Validator side of a [`Penalty`].
#[derive(Debug, Deserialize)]
pub struct PenalizedValidator {
    /// Owning account
    pub account: AccountRef,
}

/// An extrinsic record of [`EXTRINSICS_BY_ACCOUNT`].
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Extrinsic {
    /// Block the extrinsic was included in
    pub block_id: u64,

    /// Whether it executed successfully
    pub success: bool,

    /// Decoded call arguments
    #[serde(default)]
    pub args: Value,
}

/// Response of [`VALIDATORS`] and [`VALIDATOR_BY_ID`].
#[derive(Debug, Deserialize)]
pub struct CacheValidators {
    /// Matching validators
    pub validators: Nodes<ValidatorRecord>,
}

/// A validator as tracked by the cache indexer.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidatorRecord {
    /// SS58 address
    pub id_ss58: String,

    /// Operator-chosen display name
    #[serde(default)]
    pub alias: Option<String>,

    /// Bonded balance, in whole tokens
    #[serde(deserialize_with = "tokens")]
    pub locked_balance: f64,

    /// Free balance, in whole tokens
    #[serde(deserialize_with = "tokens")]
    pub unlocked_balance: f64,

    /// Lifetime rewards, in whole tokens
    #[serde(deserialize_with = "tokens")]
    pub total_rewards: f64,

    /// Current reputation
    #[serde(deserialize_with = "integer")]
    pub reputation_points: i64,

    /// Member of the current authority set
    pub is_current_authority: bool,

    /// Next in line for the authority set
    pub is_current_backup: bool,

    /// Meets the requirements to bid
    pub is_qualified: bool,

    /// Heartbeats are current
    pub is_online: bool,

    /// Takes part in the next auction
    pub is_bidding: bool,

    /// Holds key shares of a current or past epoch
    pub is_keyholder: bool,
}

impl ValidatorRecord {
    /// Member of the active set: an authority or a backup.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.is_current_authority || self.is_current_backup
    }
}

/// Block height of a witnessed chain carried by a `<Chain>ChainTracking`
/// call, with the chain name.
#[must_use]
pub fn chain_tracking(args: &Value) -> Option<(&str, u64)> {
    let call = args.get("call")?;
    let chain = crate::stats::tracked_chain(call.get("__kind")?.as_str()?)?;

    let height = match call.pointer("/value/newChainState/blockHeight")? {
        Value::Number(number) => number.as_u64()?,
        Value::String(text) => text.parse().ok()?,
        _ => return None,
    };

    Some((chain, height))
}
