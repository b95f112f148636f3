//! One price level: the FIFO queue the match loop drains.
//!
//! The continuous match loop never copies resting orders out. It borrows
//! the front order through [`PriceLevel::front_mut`], decrements its
//! remaining quantity fill by fill, and only pops it once nothing remains.
//! A level therefore never contains a fully filled order, and the book
//! drops the level itself as soon as the last order leaves it.

use std::collections::VecDeque;

use onebook_types::{Order, OrderId};
use rust_decimal::Decimal;

/// All resting orders at one price, oldest first.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    price: Decimal,
    queue: VecDeque<Order>,
}

impl PriceLevel {
    #[must_use]
    pub fn new(price: Decimal) -> Self {
        Self {
            price,
            queue: VecDeque::new(),
        }
    }

    /// The price shared by every order queued here.
    #[must_use]
    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Queue an order behind everything that arrived earlier.
    pub fn enqueue(&mut self, order: Order) {
        self.queue.push_back(order);
    }

    /// Remove and return the order with the highest time priority.
    pub fn pop_front(&mut self) -> Option<Order> {
        self.queue.pop_front()
    }

    /// The order the match loop would fill next.
    #[must_use]
    pub fn front(&self) -> Option<&Order> {
        self.queue.front()
    }

    /// Mutable handle to the next order to fill. The match loop decrements
    /// `remaining_qty` and `reserved` through this without disturbing the
    /// queue.
    pub fn front_mut(&mut self) -> Option<&mut Order> {
        self.queue.front_mut()
    }

    /// Pull one order out of the queue regardless of its position
    /// (cancellation path). Time priority of the others is untouched.
    pub fn extract(&mut self, order_id: &OrderId) -> Option<Order> {
        let pos = self.queue.iter().position(|o| o.id == *order_id)?;
        self.queue.remove(pos)
    }

    /// Unfilled quantity summed over the whole queue; what a depth
    /// snapshot reports for this level.
    #[must_use]
    pub fn total_quantity(&self) -> Decimal {
        self.queue.iter().map(|o| o.remaining_qty).sum()
    }

    /// An empty level must not stay in the book.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
