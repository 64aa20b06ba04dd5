pub mod cli;
pub mod http;

pub use cli::{Cli, CliError, CliHandler, Commands};
pub use http::{
    ApiError, ApiServer, AppState, AddressTransactionsResponse, ErrorResponse, StatusResponse,
    get_address_net_flow, get_address_transactions, get_status,
};
