// Copyright (C) 2022-2024 Webb Technologies Inc.
//
// Tangle is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Tangle is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should receive a copy of the GNU General Public License
// If not, see <http://www.gnu.org/licenses/>.

use derive_more::Display;
/// Target for logger
pub const TARGET: &str = "beefy_probe";

/// The Kind of the Probe.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// When the Lifecycle of the Relayer changes, like starting or shutting down.
    #[display(fmt = "lifecycle")]
    Lifecycle,
    /// The BEEFY listener found new commitments or finished a gap-fill.
    #[display(fmt = "beefy_listener")]
    BeefyListener,
    /// The two-phase signature commitment writer.
    #[display(fmt = "commitment_writer")]
    CommitmentWriter,
    /// The inbound channel writer on Ethereum.
    #[display(fmt = "channel_writer")]
    ChannelWriter,
    /// Header imports and message batches sent to the parachain.
    #[display(fmt = "parachain_writer")]
    ParachainWriter,
    /// Relayer Transaction dispatch state on a specific chain.
    #[display(fmt = "tx_queue")]
    TxQueue,
    /// Commitment records picked up from the store.
    #[display(fmt = "store_feeder")]
    StoreFeeder,
    /// When the relayer will retry to dial an endpoint.
    #[display(fmt = "retry")]
    Retry,
}
