// Copyright 2022 Webb Technologies Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use ethers::middleware::SignerMiddleware;
use ethers::providers::{Provider, Ws};
use ethers::signers::LocalWallet;

/// Terminal hyperlinks for transaction hashes.
pub mod explorer;
/// A module used for debugging relayer lifecycle, sync state, or other relayer state.
pub mod probe;
/// Retry policy used while dialing chain endpoints.
pub mod retry;

/// The signing client used to talk to the Ethereum side.
pub type EthereumClient = SignerMiddleware<Provider<Ws>, LocalWallet>;

/// An enum of all possible errors that could be encountered during the
/// execution of the BEEFY relayer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An Io error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// JSON Error occurred.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// Config loading error.
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    /// Error while iterating over a glob pattern.
    #[error(transparent)]
    GlobPattern(#[from] glob::PatternError),
    /// Error from Glob Iterator.
    #[error(transparent)]
    Glob(#[from] glob::GlobError),
    /// Error while parsing a URL.
    #[error(transparent)]
    Url(#[from] url::ParseError),
    /// Error while parsing the config files.
    #[error("Config parse error: {}", _0)]
    ParseConfig(#[from] serde_path_to_error::Error<config::ConfigError>),
    /// Sled database error.
    #[error(transparent)]
    Sled(#[from] sled::Error),
    /// Sled transaction error.
    #[error(transparent)]
    SledTransaction(
        #[from] sled::transaction::TransactionError<std::io::Error>,
    ),
    /// SCALE Codec error.
    #[error(transparent)]
    ScaleCodec(#[from] codec::Error),
    /// Hex decoding error.
    #[error(transparent)]
    FromHex(#[from] hex::FromHexError),
    /// Error in the Ethereum websocket provider.
    #[error(transparent)]
    EthersProvider(#[from] ethers::providers::ProviderError),
    /// Error while signing or sending an Ethereum transaction.
    #[error(transparent)]
    EthersSigner(
        #[from]
        ethers::middleware::signer::SignerMiddlewareError<
            Provider<Ws>,
            LocalWallet,
        >,
    ),
    /// Ether wallet errors.
    #[error(transparent)]
    EtherWalletError(#[from] ethers::signers::WalletError),
    /// Contract ABI encoding or decoding error.
    #[error(transparent)]
    EthAbi(#[from] ethers::abi::Error),
    /// Substrate JSON-RPC client error.
    #[error(transparent)]
    Rpc(#[from] jsonrpsee::core::ClientError),
    /// Generic error.
    #[error("{}", _0)]
    Generic(&'static str),
    /// Missing Secrets in the config, the Ethereum private key.
    #[error("Missing required private-key in the config")]
    MissingSecrets,
    /// The task was cancelled by a shutdown request.
    #[error("Task cancelled")]
    Cancelled,
    /// The receiving side of a pipeline channel has gone away.
    #[error("Pipeline channel closed")]
    ChannelClosed,
    /// A chain subscription stopped yielding items.
    #[error("Subscription closed unexpectedly")]
    SubscriptionClosed,
    /// a background task failed and stopped Abnormally.
    #[error("Task Stopped Apnormally")]
    TaskStoppedAbnormally,
    /// A channel id tag that is neither basic nor incentivized.
    #[error("Invalid channel id tag: {}", _0)]
    InvalidChannelId(u8),
    /// The commitment hash does not occur exactly once in the digest.
    #[error(
        "Commitment hash must occur exactly once in the digest, found {}",
        occurrences
    )]
    DigestSplit {
        /// How many times the hash was found.
        occurrences: usize,
    },
    /// The encoded MMR leaf does not end with its digest hash.
    #[error("MMR leaf encoding does not end with the digest hash")]
    InvalidLeaf,
    /// The simplified MMR proof does not rebuild the expected root.
    #[error("MMR proof does not match the root hash")]
    InvalidProof,
    /// A commitment payload that hashes to something else.
    #[error(
        "Commitment payload hash mismatch: expected {:?}, computed {:?}",
        expected,
        computed
    )]
    CommitmentMismatch {
        /// The hash recorded in the digest.
        expected: sp_core::H256,
        /// The hash computed from the payload.
        computed: sp_core::H256,
    },
    /// The MMR leaf commits to a different auxiliary digest.
    #[error(
        "Digest hash mismatch: leaf has {:?}, digest hashes to {:?}",
        expected,
        computed
    )]
    DigestHashMismatch {
        /// The digest hash in the MMR leaf.
        expected: sp_core::H256,
        /// Keccak hash of the rebuilt digest.
        computed: sp_core::H256,
    },
    /// The commitment payload was not found in offchain storage.
    #[error("Commitment payload not found in offchain storage")]
    MissingCommitment,
    /// A header import finalized but the header is not recorded on chain.
    #[error("Header {:?} not found in storage after import", hash)]
    HeaderNotImported {
        /// The imported header hash.
        hash: sp_core::H256,
    },
    /// The signing account has no on-chain account info.
    #[error("Account not found on chain")]
    AccountNotFound,
    /// A justification without any validator signature.
    #[error("Signed commitment has no signatures")]
    NoSigners,
    /// The random bitfield picked a validator that did not sign.
    #[error("Missing signature for validator at position {}", _0)]
    MissingSignature(usize),
    /// A validator position outside the validator set.
    #[error("Validator at position {} not found", _0)]
    ValidatorNotFound(usize),
    /// The commitment record has no MMR leaf proof attached.
    #[error("Commitment record has no MMR leaf proof")]
    MissingMmrProof,
    /// An Ethereum transaction was mined with a failed status.
    #[error("Transaction {} reverted", _0)]
    TransactionReverted(String),
    /// An Ethereum transaction disappeared from the mempool.
    #[error("Transaction {} dropped from the mempool", _0)]
    TransactionDropped(String),
    /// A commitment record with an equal or later status already exists.
    #[error("Commitment record already exists")]
    RecordExists,
    /// No commitment record for the given key.
    #[error("Commitment record not found")]
    RecordNotFound,
    /// A status update that does not move the record forward.
    #[error("Status regression from {} to {}", current, requested)]
    StatusRegression {
        /// The stored status.
        current: String,
        /// The requested status.
        requested: String,
    },
}

impl Error {
    /// Whether this error is the clean shutdown path.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// A type alias for the result for the BEEFY relayer, that uses the `Error` enum.
pub type Result<T> = std::result::Result<T, Error>;
