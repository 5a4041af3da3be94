//! Library service: catalog lookups, additions, removals, borrowing and returns

use std::sync::Arc;

use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{book::to_books, Book, BookEntity},
    repository::Repository,
};

use super::{
    cache::BookCache,
    locks::{BorrowReturnCoordinator, LockKind},
};

/// Coordinates the book store with the read cache and the borrow/return locks.
///
/// The cache is only populated when a book is added. Lookups that miss it go
/// to the store without filling it, and borrow/return never touch it, so a
/// cached copy can carry a stale `available_copies`.
#[derive(Clone)]
pub struct LibraryService {
    repository: Repository,
    cache: Arc<BookCache>,
    locks: Arc<BorrowReturnCoordinator>,
}

impl LibraryService {
    pub fn new(
        repository: Repository,
        cache: Arc<BookCache>,
        locks: Arc<BorrowReturnCoordinator>,
    ) -> Self {
        Self {
            repository,
            cache,
            locks,
        }
    }

    pub fn cache(&self) -> &BookCache {
        &self.cache
    }

    /// Add a new book to the catalog
    pub async fn add_book(&self, book: Book) -> AppResult<Book> {
        book.validate()?;
        tracing::debug!("Adding book {}", book.isbn);

        if self.repository.books.find_by_isbn(&book.isbn).await?.is_some() {
            tracing::warn!("Book {} already exists", book.isbn);
            return Err(AppError::AlreadyExists(book.isbn));
        }

        let saved = self
            .repository
            .books
            .save(BookEntity::from(book.clone()))
            .await?;
        self.cache.put(&book.isbn.clone(), book)?;

        tracing::info!("Book {} added", saved.isbn);
        Ok(saved.into())
    }

    /// Remove a book from the catalog and the cache
    pub async fn remove_book(&self, isbn: &str) -> AppResult<()> {
        let entity = self.load(isbn).await?;
        self.repository.books.delete(&entity).await?;
        self.cache.remove(isbn);

        tracing::info!("Book {} removed", isbn);
        Ok(())
    }

    /// Get a book by ISBN, from the cache when present
    pub async fn find_book_by_isbn(&self, isbn: &str) -> AppResult<Book> {
        if let Some(book) = self.cache.get(isbn) {
            tracing::debug!("Cache hit for {}", isbn);
            return Ok(book);
        }

        self.load(isbn).await.map(Book::from)
    }

    /// Get the books written by `author`.
    ///
    /// Any cached match is returned as-is without asking the store, even if
    /// the store holds more books by the same author. With no author every
    /// stored book is returned.
    pub async fn find_books_by_author(&self, author: Option<&str>) -> AppResult<Vec<Book>> {
        if let Some(author) = author {
            let cached: Vec<Book> = self
                .cache
                .get_all()
                .into_iter()
                .filter(|book| book.author == author)
                .collect();
            if !cached.is_empty() {
                tracing::debug!("{} cached books for author {:?}", cached.len(), author);
                return Ok(cached);
            }
        }

        let rows = self
            .repository
            .books
            .find_all_by_author(author.map(str::to_string))
            .await?;
        Ok(to_books(rows))
    }

    /// Take one copy off the shelf
    pub async fn borrow_book(&self, isbn: &str) -> AppResult<Book> {
        let _guard = self.locks.acquire(LockKind::Borrow, isbn).await;

        let mut entity = self.load(isbn).await?;
        if entity.available_copies <= 0 {
            tracing::warn!("No copies of {} left to borrow", isbn);
            return Err(AppError::Unavailable(isbn.to_string()));
        }

        entity.available_copies -= 1;
        let saved = self.repository.books.save(entity).await?;

        tracing::info!("Book {} borrowed, {} copies left", isbn, saved.available_copies);
        Ok(saved.into())
    }

    /// Put one copy back on the shelf. There is no upper bound on the count.
    pub async fn return_book(&self, isbn: &str) -> AppResult<Book> {
        let _guard = self.locks.acquire(LockKind::Return, isbn).await;

        let mut entity = self.load(isbn).await?;
        entity.available_copies = entity
            .available_copies
            .checked_add(1)
            .ok_or_else(|| AppError::Internal(format!("Copy count overflow for {}", isbn)))?;
        let saved = self.repository.books.save(entity).await?;

        tracing::info!("Book {} returned, {} copies available", isbn, saved.available_copies);
        Ok(saved.into())
    }

    /// Check the underlying store is reachable
    pub async fn ping(&self) -> AppResult<()> {
        self.repository.books.ping().await
    }

    async fn load(&self, isbn: &str) -> AppResult<BookEntity> {
        self.repository
            .books
            .find_by_isbn(isbn)
            .await?
            .ok_or_else(|| AppError::NotFound(isbn.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::eq;
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::{
        config::LockMode,
        repository::{BookStore, InMemoryBookStore, MockBookStore},
    };

    fn service_with(store: Arc<dyn BookStore>) -> LibraryService {
        LibraryService::new(
            Repository::with_store(store),
            Arc::new(BookCache::new()),
            Arc::new(BorrowReturnCoordinator::new(LockMode::Split)),
        )
    }

    fn mocked(store: MockBookStore) -> LibraryService {
        service_with(Arc::new(store))
    }

    fn entity(isbn: &str, author: &str, copies: i32) -> BookEntity {
        BookEntity {
            isbn: isbn.into(),
            title: "title".into(),
            author: author.into(),
            publication_year: 2024,
            available_copies: copies,
        }
    }

    // --- add / remove ---

    #[tokio::test]
    async fn test_add_book_persists_and_caches_input() {
        let book = Book::new("testIsbn", "title", "author", 2024, 1);

        let mut store = MockBookStore::new();
        store
            .expect_find_by_isbn()
            .with(eq("testIsbn"))
            .returning(|_| Ok(None));
        store
            .expect_save()
            .times(1)
            .returning(|entity| Ok(entity));
        let service = mocked(store);

        let added = assert_ok!(service.add_book(book.clone()).await);
        assert_eq!(added, book);
        assert_eq!(service.cache().get("testIsbn"), Some(book));
    }

    #[tokio::test]
    async fn test_add_book_returns_persisted_row() {
        let mut store = MockBookStore::new();
        store.expect_find_by_isbn().returning(|_| Ok(None));
        store.expect_save().returning(|mut entity| {
            entity.title = "Normalized".into();
            Ok(entity)
        });
        let service = mocked(store);

        let input = Book::new("isbn-1", "raw", "author", 2024, 1);
        let added = service.add_book(input.clone()).await.unwrap();

        assert_eq!(added.title, "Normalized");
        // The cache keeps the caller's value, not the stored one
        assert_eq!(service.cache().get("isbn-1"), Some(input));
    }

    #[tokio::test]
    async fn test_add_existing_book_fails_without_writing() {
        let mut store = MockBookStore::new();
        store
            .expect_find_by_isbn()
            .returning(|isbn| Ok(Some(entity(isbn, "author", 1))));
        store.expect_save().never();
        let service = mocked(store);

        let err = service
            .add_book(Book::new("testIsbn", "other", "author", 2024, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(isbn) if isbn == "testIsbn"));
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_add_book_with_empty_isbn_is_rejected() {
        let mut store = MockBookStore::new();
        store.expect_find_by_isbn().never();
        let service = mocked(store);

        let err = service
            .add_book(Book::new("", "title", "author", 2024, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_remove_book_deletes_and_evicts() {
        let mut store = MockBookStore::new();
        store
            .expect_find_by_isbn()
            .returning(|isbn| Ok(Some(entity(isbn, "author", 1))));
        store.expect_delete().times(1).returning(|_| Ok(()));
        let service = mocked(store);
        service
            .cache()
            .put("testIsbn", Book::new("testIsbn", "title", "author", 2024, 1))
            .unwrap();

        assert_ok!(service.remove_book("testIsbn").await);
        assert!(service.cache().get("testIsbn").is_none());
    }

    #[tokio::test]
    async fn test_remove_missing_book_leaves_cache_untouched() {
        let mut store = MockBookStore::new();
        store.expect_find_by_isbn().returning(|_| Ok(None));
        store.expect_delete().never();
        let service = mocked(store);
        let cached = Book::new("testIsbn", "title", "author", 2024, 1);
        service.cache().put("testIsbn", cached.clone()).unwrap();

        let err = service.remove_book("testIsbn").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(service.cache().get("testIsbn"), Some(cached));
    }

    // --- lookups ---

    #[tokio::test]
    async fn test_find_by_isbn_cache_hit_skips_store() {
        let mut store = MockBookStore::new();
        store.expect_find_by_isbn().never();
        let service = mocked(store);
        let book = Book::new("testIsbn", "title", "author", 2024, 1);
        service.cache().put("testIsbn", book.clone()).unwrap();

        assert_eq!(service.find_book_by_isbn("testIsbn").await.unwrap(), book);
    }

    #[tokio::test]
    async fn test_find_by_isbn_miss_reads_store_without_caching() {
        let mut store = MockBookStore::new();
        store
            .expect_find_by_isbn()
            .times(1)
            .returning(|isbn| Ok(Some(entity(isbn, "author", 3))));
        let service = mocked(store);

        let book = service.find_book_by_isbn("testIsbn").await.unwrap();
        assert_eq!(book.available_copies, 3);
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_find_by_isbn_not_found() {
        let mut store = MockBookStore::new();
        store.expect_find_by_isbn().returning(|_| Ok(None));
        let service = mocked(store);

        let err = service.find_book_by_isbn("nope").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_find_by_author_prefers_cache() {
        let mut store = MockBookStore::new();
        store.expect_find_all_by_author().never();
        let service = mocked(store);

        let book = Book::new("testIsbn", "title", "author", 2024, 1);
        let another = Book::new("isbn2", "title2", "author", 1999, 2);
        let unrelated = Book::new("isbn3", "title3", "someone else", 2001, 1);
        for b in [&book, &another, &unrelated] {
            service.cache().put(&b.isbn, b.clone()).unwrap();
        }

        let mut found = service.find_books_by_author(Some("author")).await.unwrap();
        found.sort_by(|a, b| a.isbn.cmp(&b.isbn));
        assert_eq!(found, vec![another, book]);
    }

    #[tokio::test]
    async fn test_find_by_author_falls_back_to_store() {
        let mut store = MockBookStore::new();
        store
            .expect_find_all_by_author()
            .with(eq(Some("A1".to_string())))
            .times(1)
            .returning(|_| Ok(vec![entity("isbn-1", "A1", 1), entity("isbn-2", "A1", 1)]));
        let service = mocked(store);
        service
            .cache()
            .put("isbn-9", Book::new("isbn-9", "t", "A9", 2000, 1))
            .unwrap();

        let found = service.find_books_by_author(Some("A1")).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|b| b.author == "A1"));
    }

    #[tokio::test]
    async fn test_find_by_author_none_queries_store_unfiltered() {
        let mut store = MockBookStore::new();
        store
            .expect_find_all_by_author()
            .with(eq(None::<String>))
            .returning(|_| Ok(vec![entity("isbn-1", "A1", 1), entity("isbn-3", "A3", 1)]));
        let service = mocked(store);
        service
            .cache()
            .put("isbn-1", Book::new("isbn-1", "t", "A1", 2000, 1))
            .unwrap();

        assert_eq!(service.find_books_by_author(None).await.unwrap().len(), 2);
    }

    // --- borrow / return ---

    #[tokio::test]
    async fn test_borrow_decrements_available_copies() {
        let mut store = MockBookStore::new();
        store
            .expect_find_by_isbn()
            .returning(|isbn| Ok(Some(entity(isbn, "author", 1))));
        store
            .expect_save()
            .withf(|e| e.available_copies == 0)
            .returning(|e| Ok(e));
        let service = mocked(store);

        let borrowed = service.borrow_book("testIsbn").await.unwrap();
        assert_eq!(borrowed, Book::new("testIsbn", "title", "author", 2024, 0));
    }

    #[tokio::test]
    async fn test_borrow_without_copies_is_unavailable() {
        let mut store = MockBookStore::new();
        store
            .expect_find_by_isbn()
            .returning(|isbn| Ok(Some(entity(isbn, "author", 0))));
        store.expect_save().never();
        let service = mocked(store);

        let err = service.borrow_book("testIsbn").await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_borrow_missing_book() {
        let mut store = MockBookStore::new();
        store.expect_find_by_isbn().returning(|_| Ok(None));
        let service = mocked(store);

        let err = service.borrow_book("testIsbn").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert_eq!(service.locks.pending(LockKind::Borrow), 0);
    }

    #[tokio::test]
    async fn test_return_increments_available_copies() {
        let mut store = MockBookStore::new();
        store
            .expect_find_by_isbn()
            .returning(|isbn| Ok(Some(entity(isbn, "author", 1))));
        store.expect_save().returning(|e| Ok(e));
        let service = mocked(store);

        let returned = service.return_book("testIsbn").await.unwrap();
        assert_eq!(returned, Book::new("testIsbn", "title", "author", 2024, 2));
    }

    #[tokio::test]
    async fn test_return_missing_book() {
        let mut store = MockBookStore::new();
        store.expect_find_by_isbn().returning(|_| Ok(None));
        let service = mocked(store);

        assert_err!(service.return_book("testIsbn").await);
        assert_eq!(service.locks.pending(LockKind::Return), 0);
    }

    #[tokio::test]
    async fn test_borrow_until_unavailable_then_return() {
        let store = Arc::new(InMemoryBookStore::with_rows([BookEntity {
            isbn: "isbn-1".into(),
            title: "T1".into(),
            author: "A1".into(),
            publication_year: 2020,
            available_copies: 1,
        }]));
        let service = service_with(store.clone());

        assert_eq!(service.borrow_book("isbn-1").await.unwrap().available_copies, 0);
        let err = service.borrow_book("isbn-1").await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(_)));
        assert_eq!(
            store.find_by_isbn("isbn-1").await.unwrap().unwrap().available_copies,
            0
        );

        assert_eq!(service.return_book("isbn-1").await.unwrap().available_copies, 1);
    }

    #[tokio::test]
    async fn test_borrow_does_not_refresh_cache() {
        let service = service_with(Arc::new(InMemoryBookStore::new()));
        service
            .add_book(Book::new("isbn-1", "T1", "A1", 2020, 2))
            .await
            .unwrap();

        service.borrow_book("isbn-1").await.unwrap();

        // Stale by design: the cached copy still reports the original count
        let cached = service.find_book_by_isbn("isbn-1").await.unwrap();
        assert_eq!(cached.available_copies, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_borrows_never_lose_updates() {
        let store = Arc::new(InMemoryBookStore::with_rows([entity("hot", "author", 10)]));
        let service = service_with(store.clone());

        let tasks: Vec<_> = (0..25)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move { service.borrow_book("hot").await })
            })
            .collect();

        let mut succeeded = 0;
        let mut unavailable = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(book) => {
                    assert!(book.available_copies >= 0);
                    succeeded += 1;
                }
                Err(AppError::Unavailable(_)) => unavailable += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(succeeded, 10);
        assert_eq!(unavailable, 15);
        let row = store.find_by_isbn("hot").await.unwrap().unwrap();
        assert_eq!(row.available_copies, 0);
    }

    #[tokio::test]
    async fn test_return_at_max_copies_fails_without_writing() {
        let store = Arc::new(InMemoryBookStore::new());
        let service = service_with(store.clone());
        service
            .add_book(Book::new("big", "t", "a", 2020, i32::MAX))
            .await
            .unwrap();

        let err = service.return_book("big").await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
        assert_eq!(
            store.find_by_isbn("big").await.unwrap().unwrap().available_copies,
            i32::MAX
        );
        assert_eq!(service.locks.pending(LockKind::Return), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_unified_locks_keep_borrows_and_returns_consistent() {
        let store = Arc::new(InMemoryBookStore::with_rows([entity("hot", "author", 50)]));
        let service = LibraryService::new(
            Repository::with_store(store.clone()),
            Arc::new(BookCache::new()),
            Arc::new(BorrowReturnCoordinator::new(LockMode::Unified)),
        );

        let tasks: Vec<_> = (0..40)
            .map(|i| {
                let service = service.clone();
                tokio::spawn(async move {
                    if i % 4 != 3 {
                        service.borrow_book("hot").await
                    } else {
                        service.return_book("hot").await
                    }
                })
            })
            .collect();
        for task in tasks {
            assert_ok!(task.await.unwrap());
        }

        // 30 borrows and 10 returns from 50, none of them lost
        let row = store.find_by_isbn("hot").await.unwrap().unwrap();
        assert_eq!(row.available_copies, 50 - 30 + 10);
        assert_eq!(service.locks.pending(LockKind::Borrow), 0);
    }
}
