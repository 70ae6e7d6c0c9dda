use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{Comment, Notification, Post, User};

/// 一意な ID でページ間の重複排除を行うためのトレイト
pub trait Identified {
    fn entity_id(&self) -> &str;
}

impl Identified for Post {
    fn entity_id(&self) -> &str {
        &self.id
    }
}

impl Identified for Comment {
    fn entity_id(&self) -> &str {
        &self.id
    }
}

impl Identified for User {
    fn entity_id(&self) -> &str {
        &self.id
    }
}

impl Identified for Notification {
    fn entity_id(&self) -> &str {
        &self.id
    }
}

/// サーバーから取得した 1 ページ。next / previous はサーバー発行の
/// 不透明なカーソルで、クライアントは有無の判定以外に解釈しない。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
    pub previous: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next: Option<String>, previous: Option<String>) -> Self {
        Self {
            items,
            next,
            previous,
        }
    }

    /// 楽観的挿入用の単独ページ（カーソルなし）
    pub fn synthetic(items: Vec<T>) -> Self {
        Self {
            items,
            next: None,
            previous: None,
        }
    }
}

/// ページの列。ページを追いかけて伸びていく順序付きコレクションで、
/// 後続ページの追加が先行ページの順序を変えることはない。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaginatedCollection<T> {
    pub pages: Vec<Page<T>>,
}

impl<T> Default for PaginatedCollection<T> {
    fn default() -> Self {
        Self { pages: Vec::new() }
    }
}

impl<T> PaginatedCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_page(page: Page<T>) -> Self {
        Self { pages: vec![page] }
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// 次ページ取得に使うカーソル（最後のページの next）。
    /// None は「これ以上ページがない」ことを表す。
    pub fn next_cursor(&self) -> Option<&str> {
        self.pages.last().and_then(|page| page.next.as_deref())
    }

    /// 末尾にページを追加する
    pub fn push_page(&mut self, page: Page<T>) {
        self.pages.push(page);
    }

    /// 先頭ページの先頭に要素を挿入する。ページが無ければ単独ページを作る。
    pub fn prepend(&mut self, item: T) {
        match self.pages.first_mut() {
            Some(first) => first.items.insert(0, item),
            None => self.pages.push(Page::synthetic(vec![item])),
        }
    }

    /// 条件を満たす要素だけ残す（全ページ対象）
    pub fn retain<F>(&mut self, mut keep: F)
    where
        F: FnMut(&T) -> bool,
    {
        for page in &mut self.pages {
            page.items.retain(|item| keep(item));
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.pages.iter().flat_map(|page| page.items.iter())
    }

    pub fn total_items(&self) -> usize {
        self.pages.iter().map(|page| page.items.len()).sum()
    }
}

impl<T: Identified + Clone> PaginatedCollection<T> {
    /// 全ページを順に連結した可視シーケンスを返す。同じ ID が複数ページに
    /// 現れた場合は先に現れた方（= 直近に書き込まれた側）を採用する。
    pub fn flatten(&self) -> Vec<T> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut items = Vec::with_capacity(self.total_items());
        for item in self.iter() {
            if seen.insert(item.entity_id().to_string()) {
                items.push(item.clone());
            }
        }
        items
    }

    /// ID が一致する要素をすべて置き換える
    pub fn replace_by_id(&mut self, id: &str, replacement: &T) -> bool {
        let mut replaced = false;
        for page in &mut self.pages {
            for item in &mut page.items {
                if item.entity_id() == id {
                    *item = replacement.clone();
                    replaced = true;
                }
            }
        }
        replaced
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.iter().any(|item| item.entity_id() == id)
    }
}
