pub mod mock_gateway;
pub mod mock_refresher;

pub use mock_gateway::MockFeedGateway;
pub use mock_refresher::MockTokenRefresher;
