pub mod address;
pub mod address_tx;
pub mod currency;
pub mod net_flow;
pub mod tzkt;

pub use address::{AddressKind, AddressValidator};
pub use address_tx::{AddressLedger, AddressTxRecord, Direction, ExtractedLedger};
pub use currency::{Currency, XTZ_DECIMALS, XTZ_SYMBOL};
pub use net_flow::{AddressNetFlow, CalculationError, NetFlowCalculator};
pub use tzkt::{Block, Head, OperationStatus, Party, RawAmount, TransactionOp};
