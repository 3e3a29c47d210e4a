//! Mutation bindings for every state-changing endpoint.
//!
//! None of these requests opt into automatic retry: replaying a dispatch or
//! a payment decision could duplicate it server-side.

use std::sync::Arc;

use crate::client::ApiClient;
use crate::fetch::{fetcher, Mutation};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{
    ApprovePayment, DispatchCleanup, Execution, Image, ImageUpload, PaymentDecisionResult, Pickup,
    PickupSchedule, VerificationResult, VerifyCleanup, Weather, WeatherReading,
};

pub struct Mutations<T = ReqwestTransport> {
    client: Arc<ApiClient<T>>,
}

impl<T> Clone for Mutations<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
        }
    }
}

impl<T: Transport + 'static> Mutations<T> {
    pub fn new(client: Arc<ApiClient<T>>) -> Self {
        Self { client }
    }

    pub fn dispatch_cleanup(&self) -> Mutation<DispatchCleanup, Execution> {
        let client = self.client.clone();
        Mutation::new(
            "dispatch_cleanup",
            fetcher(move |input: DispatchCleanup| {
                let client = client.clone();
                async move { client.dispatch_cleanup(&input).await }
            }),
        )
    }

    pub fn verify_cleanup(&self) -> Mutation<VerifyCleanup, VerificationResult> {
        let client = self.client.clone();
        Mutation::new(
            "verify_cleanup",
            fetcher(move |input: VerifyCleanup| {
                let client = client.clone();
                async move { client.verify_cleanup(&input).await }
            }),
        )
    }

    pub fn approve_payment(&self) -> Mutation<ApprovePayment, PaymentDecisionResult> {
        let client = self.client.clone();
        Mutation::new(
            "approve_payment",
            fetcher(move |input: ApprovePayment| {
                let client = client.clone();
                async move { client.approve_payment(&input).await }
            }),
        )
    }

    pub fn ingest_image(&self) -> Mutation<ImageUpload, Image> {
        let client = self.client.clone();
        Mutation::new(
            "ingest_image",
            fetcher(move |upload: ImageUpload| {
                let client = client.clone();
                async move { client.ingest_image(&upload).await }
            }),
        )
    }

    pub fn ingest_weather(&self) -> Mutation<WeatherReading, Weather> {
        let client = self.client.clone();
        Mutation::new(
            "ingest_weather",
            fetcher(move |reading: WeatherReading| {
                let client = client.clone();
                async move { client.ingest_weather(&reading).await }
            }),
        )
    }

    pub fn ingest_pickup_schedule(&self) -> Mutation<PickupSchedule, Pickup> {
        let client = self.client.clone();
        Mutation::new(
            "ingest_pickup_schedule",
            fetcher(move |schedule: PickupSchedule| {
                let client = client.clone();
                async move { client.ingest_pickup_schedule(&schedule).await }
            }),
        )
    }
}
