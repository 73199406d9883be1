pub mod order_payload;
