//! Bank record service - create and look up linked bank-account documents.

use crate::{
    error::AppError,
    models::bank::{BankAccount, NewBankAccount},
    providers::{Collection, Document, DocumentStore, Filter, attributes},
    shareable::ShareableIds,
};

fn decode_all(documents: &[Document]) -> Result<Vec<BankAccount>, AppError> {
    documents
        .iter()
        .map(|document| document.decode().map_err(AppError::from))
        .collect()
}

/// Persist a bank-account document.
pub async fn create_bank_account(
    store: &dyn DocumentStore,
    bank: &NewBankAccount,
) -> Result<BankAccount, AppError> {
    let document = store
        .create_document(Collection::Banks, attributes(bank)?)
        .await?;

    Ok(document.decode()?)
}

/// All bank accounts owned by a user (user document id).
pub async fn get_banks(
    store: &dyn DocumentStore,
    user_id: &str,
) -> Result<Vec<BankAccount>, AppError> {
    let list = store
        .list_documents(Collection::Banks, &[Filter::equal("userId", user_id)])
        .await?;

    decode_all(&list.documents)
}

/// Bank account by document id.
///
/// # Errors
///
/// - `BankNotFound`: no document with that id
pub async fn get_bank(
    store: &dyn DocumentStore,
    document_id: &str,
) -> Result<BankAccount, AppError> {
    let list = store
        .list_documents(
            Collection::Banks,
            &[Filter::equal(Filter::DOCUMENT_ID, document_id)],
        )
        .await?;

    let document = list.documents.first().ok_or(AppError::BankNotFound)?;
    Ok(document.decode()?)
}

/// Bank account by aggregator account id.
///
/// Account ids are expected to be unique: anything other than exactly one
/// match (none, or an ambiguous several) yields `None`.
pub async fn get_bank_by_account_id(
    store: &dyn DocumentStore,
    account_id: &str,
) -> Result<Option<BankAccount>, AppError> {
    let list = store
        .list_documents(Collection::Banks, &[Filter::equal("accountId", account_id)])
        .await?;

    if list.total != 1 {
        if list.total > 1 {
            tracing::warn!(
                account_id,
                matches = list.total,
                "Ambiguous bank lookup by account id"
            );
        }
        return Ok(None);
    }

    list.documents
        .first()
        .map(|document| document.decode().map_err(AppError::from))
        .transpose()
}

/// Whether any bank record already references the account.
pub async fn is_account_linked(
    store: &dyn DocumentStore,
    account_id: &str,
) -> Result<bool, AppError> {
    let list = store
        .list_documents(Collection::Banks, &[Filter::equal("accountId", account_id)])
        .await?;

    Ok(list.total > 0)
}

/// Bank account behind a shareable id.
///
/// # Errors
///
/// - `InvalidRequest`: malformed or forged shareable id
/// - `BankNotFound`: no unique record for the decoded account id
pub async fn get_bank_by_shareable_id(
    store: &dyn DocumentStore,
    ids: &ShareableIds,
    shareable_id: &str,
) -> Result<BankAccount, AppError> {
    let account_id = ids.decode(shareable_id)?;

    get_bank_by_account_id(store, &account_id)
        .await?
        .ok_or(AppError::BankNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::fake::FakeStore;

    fn new_bank(user_id: &str, account_id: &str, ids: &ShareableIds) -> NewBankAccount {
        NewBankAccount {
            user_id: user_id.to_string(),
            bank_id: "item-1".to_string(),
            account_id: account_id.to_string(),
            access_token: "access-sandbox-1".to_string(),
            funding_source_url: "https://api-sandbox.dwolla.com/funding-sources/1".to_string(),
            shareable_id: ids.encode(account_id),
        }
    }

    #[tokio::test]
    async fn lookup_by_account_id_requires_exactly_one_match() {
        let store = FakeStore::default();
        let ids = ShareableIds::new("secret");

        // zero
        assert_eq!(get_bank_by_account_id(&store, "acc-1").await.unwrap(), None);

        // one
        let created = create_bank_account(&store, &new_bank("u-1", "acc-1", &ids))
            .await
            .unwrap();
        assert_eq!(
            get_bank_by_account_id(&store, "acc-1").await.unwrap(),
            Some(created)
        );

        // more than one
        create_bank_account(&store, &new_bank("u-2", "acc-1", &ids))
            .await
            .unwrap();
        assert_eq!(get_bank_by_account_id(&store, "acc-1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn banks_are_listed_per_user() {
        let store = FakeStore::default();
        let ids = ShareableIds::new("secret");

        for (user, account) in [("u-1", "acc-1"), ("u-1", "acc-2"), ("u-2", "acc-3")] {
            create_bank_account(&store, &new_bank(user, account, &ids))
                .await
                .unwrap();
        }

        let banks = get_banks(&store, "u-1").await.unwrap();
        assert_eq!(banks.len(), 2);
        assert!(banks.iter().all(|bank| bank.user_id == "u-1"));
        assert!(get_banks(&store, "u-3").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_document_id_is_bank_not_found() {
        let store = FakeStore::default();
        let ids = ShareableIds::new("secret");
        let created = create_bank_account(&store, &new_bank("u-1", "acc-1", &ids))
            .await
            .unwrap();

        assert_eq!(get_bank(&store, &created.id).await.unwrap(), created);
        assert!(matches!(
            get_bank(&store, "missing").await,
            Err(AppError::BankNotFound)
        ));
    }

    #[tokio::test]
    async fn shareable_id_resolves_to_bank() {
        let store = FakeStore::default();
        let ids = ShareableIds::new("secret");
        let created = create_bank_account(&store, &new_bank("u-1", "acc-1", &ids))
            .await
            .unwrap();

        let found = get_bank_by_shareable_id(&store, &ids, &created.shareable_id)
            .await
            .unwrap();
        assert_eq!(found.id, created.id);

        let unknown = ids.encode("acc-unknown");
        assert!(matches!(
            get_bank_by_shareable_id(&store, &ids, &unknown).await,
            Err(AppError::BankNotFound)
        ));
        assert!(matches!(
            get_bank_by_shareable_id(&store, &ids, "garbage").await,
            Err(AppError::InvalidRequest(_))
        ));
    }
}
