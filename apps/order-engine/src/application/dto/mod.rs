//! Data Transfer Objects (DTOs)
//!
//! DTOs are used for API boundaries and use case inputs/outputs.

mod market_dto;
mod order_dto;

pub use market_dto::{
    ExpirationsResponseDto, OtmCandidatesDto, OtmOptionsResponseDto, RecommendationsResponseDto,
    StockPriceResponseDto, StrikesResponseDto,
};
pub use order_dto::{
    CreateOrderDto, CreateOrderResponseDto, OrderActionResponseDto, OrderDto,
    OrdersResponseDto, RolloverRequestDto, RolloverResponseDto, UpdateQuantityDto,
};
