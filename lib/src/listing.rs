//! Sorting and filtering of content lists (summaries, flashcards, questions,
//! mind maps, audio summaries) across every source.

use std::cmp::Ordering;
use std::collections::HashSet;

use uuid::Uuid;

use crate::data::{AppData, ContentItem, Source};
use crate::votes::Votable;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Hot minus cold votes, hottest first.
    #[default]
    Temperature,
    /// Newest source first.
    Time,
    Subject,
    User,
    Source,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadFilter {
    #[default]
    All,
    Read,
    Unread,
}

#[derive(Clone, Debug, Default)]
pub struct ContentFilter {
    pub read: ReadFilter,
    pub favorites_only: bool,
    /// Ids kept by an AI filter; `None` keeps everything.
    pub ai_ids: Option<HashSet<Uuid>>,
}

#[derive(Debug)]
pub struct ListedItem<'a, T> {
    pub item: &'a T,
    pub source: &'a Source,
    pub is_read: bool,
    pub is_favorite: bool,
}

/// Every item of type `T` visible to `user_id` under `filter`, in `order`.
pub fn list_content<'a, T: ContentItem>(
    data: &'a AppData,
    user_id: &str,
    filter: &ContentFilter,
    order: SortOrder,
) -> Vec<ListedItem<'a, T>> {
    let mut items = data
        .sources
        .iter()
        .flat_map(|source| T::in_source(source).iter().map(move |item| (source, item)))
        .map(|(source, item)| {
            let interaction =
                data.content_interaction(user_id, &item.id().to_string(), T::CONTENT_TYPE);

            ListedItem {
                item,
                source,
                is_read: interaction.map_or(false, |interaction| interaction.is_read),
                is_favorite: interaction.map_or(false, |interaction| interaction.is_favorite),
            }
        })
        .filter(|listed| filter.keeps(listed))
        .collect::<Vec<_>>();

    sort_content(data, &mut items, order);

    items
}

impl ContentFilter {
    fn keeps<T: ContentItem>(&self, listed: &ListedItem<'_, T>) -> bool {
        let read = match self.read {
            ReadFilter::All => true,
            ReadFilter::Read => listed.is_read,
            ReadFilter::Unread => !listed.is_read,
        };

        read && (!self.favorites_only || listed.is_favorite)
            && self
                .ai_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&listed.item.id()))
    }
}

pub fn sort_content<T: ContentItem>(data: &AppData, items: &mut [ListedItem<'_, T>], order: SortOrder) {
    let author = |source: &Source| {
        data.user(&source.user_id)
            .map(|user| user.pseudonym.to_lowercase())
            .unwrap_or_default()
    };

    match order {
        SortOrder::Temperature => {
            items.sort_by_key(|listed| std::cmp::Reverse(listed.item.votes().temperature()))
        }
        SortOrder::Time => items.sort_by(|a, b| newest_first(a.source, b.source)),
        SortOrder::Subject => items.sort_by(|a, b| {
            (&a.source.materia, &a.source.topic).cmp(&(&b.source.materia, &b.source.topic))
        }),
        SortOrder::User => items.sort_by_cached_key(|listed| author(listed.source)),
        SortOrder::Source => items.sort_by_cached_key(|listed| listed.source.title.to_lowercase()),
    }
}

fn newest_first(a: &Source, b: &Source) -> Ordering {
    match (a.created_at, b.created_at) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
