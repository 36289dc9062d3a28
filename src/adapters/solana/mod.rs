pub mod rpc;
pub mod snapshot;
pub mod wallet;

pub use rpc::SolanaClient;
pub use snapshot::RpcSnapshotProvider;
pub use wallet::WalletManager;
