//! Loaders behind the maintenance screens.

use std::sync::Arc;

use eggo_adapters::{AuthAdapter, DataAdapter};
use tracing::{debug, error};

use super::or_empty;
use crate::database::models::{Condominium, DeliveryWindow, EggSize, ManagedUser, PaymentMethod};
use crate::database::{fetch, queries};

pub struct AdminService {
    auth: Arc<dyn AuthAdapter>,
    data: Arc<dyn DataAdapter>,
}

impl AdminService {
    pub fn new(auth: Arc<dyn AuthAdapter>, data: Arc<dyn DataAdapter>) -> Self {
        Self { auth, data }
    }

    pub async fn users(&self) -> Vec<ManagedUser> {
        match self.auth.list_users().await {
            Ok(users) => {
                debug!(count = users.len(), "fetched users");
                users.into_iter().map(ManagedUser::from).collect()
            }
            Err(err) => {
                error!(error = %err, "error fetching users");
                Vec::new()
            }
        }
    }

    pub async fn condominiums(&self) -> Vec<Condominium> {
        or_empty(fetch(self.data.as_ref(), &queries::condominiums()).await)
    }

    pub async fn delivery_windows(&self) -> Vec<DeliveryWindow> {
        or_empty(fetch(self.data.as_ref(), &queries::delivery_windows()).await)
    }

    pub async fn payment_methods(&self) -> Vec<PaymentMethod> {
        or_empty(fetch(self.data.as_ref(), &queries::payment_methods()).await)
    }

    pub async fn egg_sizes(&self) -> Vec<EggSize> {
        or_empty(fetch(self.data.as_ref(), &queries::egg_sizes()).await)
    }
}
