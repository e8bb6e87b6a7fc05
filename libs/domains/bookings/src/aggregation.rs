//! Decorates items with their nearest approved bookings and their comments.
//!
//! Both the single-item and the batch entry point go through
//! one private `build` step, which issues at most three bulk lookups no
//! matter how many items are passed in:
//!
//! 1. approved bookings with `start <= now` for the viewer's own items
//! 2. approved bookings with `start > now` for the viewer's own items
//! 3. comments for all items
//!
//! The results are folded into an [`ItemIndex`] keyed by item id, and each
//! view is assembled from that index.

use std::collections::HashMap;
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::BookingResult;
use crate::models::{AuthoredComment, Booking, CommentView, Item, ItemView};
use crate::repository::{BookingRepository, CommentRepository};

/// Per-item lookup tables built once per aggregation call.
#[derive(Debug, Default)]
pub struct ItemIndex {
    last: HashMap<i64, Booking>,
    next: HashMap<i64, Booking>,
    comments: HashMap<i64, Vec<CommentView>>,
}

impl ItemIndex {
    /// `started` and `upcoming` may come in any order; comments are expected
    /// newest first and keep their order within each item.
    pub fn build(
        started: Vec<Booking>,
        upcoming: Vec<Booking>,
        comments: Vec<AuthoredComment>,
    ) -> Self {
        let mut index = ItemIndex::default();

        for booking in started {
            let better = index
                .last
                .get(&booking.item_id)
                .is_none_or(|best| (booking.end, booking.id) > (best.end, best.id));
            if better {
                index.last.insert(booking.item_id, booking);
            }
        }

        for booking in upcoming {
            let better = index
                .next
                .get(&booking.item_id)
                .is_none_or(|best| (booking.end, booking.id) < (best.end, best.id));
            if better {
                index.next.insert(booking.item_id, booking);
            }
        }

        for authored in comments {
            index
                .comments
                .entry(authored.comment.item_id)
                .or_default()
                .push(authored.to_view());
        }

        index
    }

    pub fn view(&self, item: &Item, show_bookings: bool) -> ItemView {
        let mut view = ItemView::bare(item);
        if show_bookings {
            view.last_booking = self.last.get(&item.id).map(Booking::to_short);
            view.next_booking = self.next.get(&item.id).map(Booking::to_short);
        }
        view.comments = self.comments.get(&item.id).cloned().unwrap_or_default();
        view
    }
}

#[derive(Clone)]
pub struct ItemAggregator {
    bookings: Arc<dyn BookingRepository>,
    comments: Arc<dyn CommentRepository>,
    clock: Arc<dyn Clock>,
}

impl ItemAggregator {
    pub fn new(
        bookings: Arc<dyn BookingRepository>,
        comments: Arc<dyn CommentRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bookings,
            comments,
            clock,
        }
    }

    /// Decorates one item for `viewer_id`.
    ///
    /// Last/next bookings are only attached when the viewer owns the item.
    pub async fn decorate(&self, item: &Item, viewer_id: i64) -> BookingResult<ItemView> {
        let mut views = self.build(std::slice::from_ref(item), viewer_id).await?;
        Ok(views.pop().unwrap_or_else(|| ItemView::bare(item)))
    }

    /// Decorates an owner's inventory in one pass, preserving input order.
    pub async fn decorate_all(
        &self,
        items: &[Item],
        owner_id: i64,
    ) -> BookingResult<Vec<ItemView>> {
        self.build(items, owner_id).await
    }

    async fn build(&self, items: &[Item], viewer_id: i64) -> BookingResult<Vec<ItemView>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let now = self.clock.now();
        let all_ids: Vec<i64> = items.iter().map(|i| i.id).collect();
        let owned_ids: Vec<i64> = items
            .iter()
            .filter(|i| i.owner_id == viewer_id)
            .map(|i| i.id)
            .collect();

        let (started, upcoming) = if owned_ids.is_empty() {
            (Vec::new(), Vec::new())
        } else {
            tokio::try_join!(
                self.bookings.find_approved_started(owned_ids.clone(), now),
                self.bookings.find_approved_upcoming(owned_ids, now),
            )?
        };
        let comments = self.comments.find_by_items(all_ids).await?;

        tracing::debug!(
            items = items.len(),
            started = started.len(),
            upcoming = upcoming.len(),
            comments = comments.len(),
            "Aggregating item views"
        );

        let index = ItemIndex::build(started, upcoming, comments);
        Ok(items
            .iter()
            .map(|item| index.view(item, item.owner_id == viewer_id))
            .collect())
    }
}
