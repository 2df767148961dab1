//! Account audit records and customer-account links.

use alloc::{collections::BTreeMap, string::String, vec::Vec};

use bon::Builder;
use chrono::{DateTime, Utc};
use dissolve_derive::Dissolve;
use strum::{Display, EnumString, IntoStaticStr};

use crate::{AccountId, AuditId, AuditOperation, CustomerId, Timestamps};

/// Lifecycle status of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    /// The account is open for business.
    Open,
    /// The account was closed.
    Closed,
    /// The account was seized.
    Seized,
    /// The account was created but is not open yet.
    Created,
}

/// Product type of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
#[strum(serialize_all = "SCREAMING-KEBAB-CASE")]
pub enum AccountType {
    /// A current (checking) account. Every customer owns exactly one.
    Current,
    /// A savings account.
    Savings,
    /// A sub-account that may be shared with member customers.
    SubAccount,
}

/// The relationship a link grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkRole {
    /// The primary owner of the account.
    Owner,
    /// A customer granted shared access by the owner.
    Member,
}

/// Whether a link grants or revokes the relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LinkAction {
    /// The relationship starts.
    Added,
    /// The relationship ends.
    Removed,
}

/// One snapshot of an account.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
pub struct AccountAuditRecord {
    /// The identifier of this snapshot.
    audit_id: AuditId,

    /// The account this snapshot describes.
    account_id: AccountId,

    /// Lifecycle status.
    status: AccountStatus,

    /// Product type.
    account_type: AccountType,

    /// Code of the legal entity holding the account.
    legal_entity: String,

    /// When the account was opened, if it was.
    opened_at: Option<DateTime<Utc>>,

    /// When the account was closed, if it was.
    closed_at: Option<DateTime<Utc>>,

    /// Creation and snapshot timestamps.
    timestamps: Timestamps,

    /// Whether this snapshot is the first one or a later one.
    operation: AuditOperation,
}

impl AccountAuditRecord {
    /// Returns the snapshot id.
    pub fn audit_id(&self) -> AuditId {
        self.audit_id
    }

    /// Returns the account id.
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Returns the status.
    pub fn status(&self) -> AccountStatus {
        self.status
    }

    /// Returns the product type.
    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    /// Returns the legal entity code.
    pub fn legal_entity(&self) -> &str {
        &self.legal_entity
    }

    /// Returns the opening timestamp.
    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.opened_at
    }

    /// Returns the closing timestamp.
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
    }

    /// Returns both lifecycle timestamps.
    pub fn timestamps(&self) -> Timestamps {
        self.timestamps
    }

    /// Returns the creation timestamp.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.timestamps.created_at()
    }

    /// Returns the timestamp of this version.
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.timestamps.updated_at()
    }

    /// Returns the audit operation.
    pub fn operation(&self) -> AuditOperation {
        self.operation
    }
}

/// A relationship row between a customer and an account.
#[derive(Debug, Clone, PartialEq, Eq, Builder, Dissolve)]
pub struct CustomerAccountLink {
    /// The customer being linked.
    customer_id: CustomerId,

    /// The account being linked.
    account_id: AccountId,

    /// Ownership or membership.
    role: LinkRole,

    /// Grant or revocation.
    action: LinkAction,

    /// When the link took effect.
    created_at: DateTime<Utc>,
}

impl CustomerAccountLink {
    /// Returns the linked customer.
    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Returns the linked account.
    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    /// Returns the role.
    pub fn role(&self) -> LinkRole {
        self.role
    }

    /// Returns the action.
    pub fn action(&self) -> LinkAction {
        self.action
    }

    /// Returns when the link took effect.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// The accounts and links created for one customer, persisted as a single unit.
///
/// A batch can only be constructed when its links are consistent:
/// - every account has exactly one owner link, held by the batch owner
/// - every link refers to an account of the batch
/// - member links never name the owner, never repeat a member, and never predate the
///   owner link of their account
#[derive(Debug, Clone, Dissolve)]
pub struct AccountBatch {
    /// The customer owning every account of the batch.
    owner: CustomerId,

    /// The new accounts.
    accounts: Vec<AccountAuditRecord>,

    /// Owner links first per account, followed by that account's member links.
    links: Vec<CustomerAccountLink>,
}

/// Errors raised when an [`AccountBatch`] violates a link invariant.
#[derive(Debug, thiserror::Error)]
pub enum AccountBatchError {
    /// An account has no owner link.
    #[error("account {0} has no owner link")]
    MissingOwner(AccountId),

    /// An account has more than one owner link.
    #[error("account {0} has more than one owner link")]
    DuplicateOwner(AccountId),

    /// An owner link names a customer other than the batch owner.
    #[error("account {account_id} is owned by {customer_id}, not by the batch owner")]
    ForeignOwner {
        /// The account carrying the link.
        account_id: AccountId,
        /// The customer named by the owner link.
        customer_id: CustomerId,
    },

    /// A link refers to an account outside the batch.
    #[error("link refers to account {0} outside the batch")]
    UnknownAccount(AccountId),

    /// A member link names the owner of the account.
    #[error("owner {customer_id} is also a member of account {account_id}")]
    SelfMembership {
        /// The account carrying the link.
        account_id: AccountId,
        /// The owner.
        customer_id: CustomerId,
    },

    /// The same member is linked twice to one account.
    #[error("customer {customer_id} is a member of account {account_id} more than once")]
    DuplicateMember {
        /// The account carrying the links.
        account_id: AccountId,
        /// The repeated member.
        customer_id: CustomerId,
    },

    /// A member link predates the owner link of its account.
    #[error("member link on account {0} predates the owner link")]
    MemberBeforeOwner(AccountId),
}

#[bon::bon]
impl AccountBatch {
    /// Creates a batch after checking every link invariant.
    ///
    /// Returns an error describing the first violated invariant.
    #[builder]
    pub fn new(
        owner: CustomerId,
        accounts: Vec<AccountAuditRecord>,
        links: Vec<CustomerAccountLink>,
    ) -> Result<Self, AccountBatchError> {
        let mut owned_at: BTreeMap<AccountId, Option<DateTime<Utc>>> =
            accounts.iter().map(|account| (account.account_id(), None)).collect();

        for link in links.iter().filter(|link| link.role() == LinkRole::Owner) {
            let slot = owned_at
                .get_mut(&link.account_id())
                .ok_or(AccountBatchError::UnknownAccount(link.account_id()))?;

            if link.customer_id() != owner {
                return Err(AccountBatchError::ForeignOwner {
                    account_id: link.account_id(),
                    customer_id: link.customer_id(),
                });
            }

            if slot.replace(link.created_at()).is_some() {
                return Err(AccountBatchError::DuplicateOwner(link.account_id()));
            }
        }

        let mut members: BTreeMap<AccountId, Vec<CustomerId>> = BTreeMap::new();

        for link in links.iter().filter(|link| link.role() == LinkRole::Member) {
            let owner_link_at = owned_at
                .get(&link.account_id())
                .copied()
                .ok_or(AccountBatchError::UnknownAccount(link.account_id()))?
                .ok_or(AccountBatchError::MissingOwner(link.account_id()))?;

            if link.customer_id() == owner {
                return Err(AccountBatchError::SelfMembership {
                    account_id: link.account_id(),
                    customer_id: owner,
                });
            }

            if link.created_at() < owner_link_at {
                return Err(AccountBatchError::MemberBeforeOwner(link.account_id()));
            }

            let seen = members.entry(link.account_id()).or_default();
            if seen.contains(&link.customer_id()) {
                return Err(AccountBatchError::DuplicateMember {
                    account_id: link.account_id(),
                    customer_id: link.customer_id(),
                });
            }
            seen.push(link.customer_id());
        }

        if let Some((&account_id, _)) = owned_at.iter().find(|(_, at)| at.is_none()) {
            return Err(AccountBatchError::MissingOwner(account_id));
        }

        Ok(Self { owner, accounts, links })
    }
}

impl AccountBatch {
    /// Returns the owning customer.
    pub fn owner(&self) -> CustomerId {
        self.owner
    }

    /// Returns the accounts.
    pub fn accounts(&self) -> &[AccountAuditRecord] {
        &self.accounts
    }

    /// Returns the links.
    pub fn links(&self) -> &[CustomerAccountLink] {
        &self.links
    }

    /// Returns the member links of the batch.
    pub fn member_links(&self) -> impl Iterator<Item = &CustomerAccountLink> {
        self.links.iter().filter(|link| link.role() == LinkRole::Member)
    }
}
