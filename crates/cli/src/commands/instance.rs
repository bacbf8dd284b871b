// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance registration and monitoring control.

use crate::client::Client;
use vigil_core::InstanceId;
use vigil_wire::Request;

pub async fn register(instance: &str) -> anyhow::Result<()> {
    let mut client = Client::connect().await?;
    client
        .expect_ok(&Request::Register { instance: InstanceId::from_string(instance) })
        .await?;
    println!("registered {instance}");
    Ok(())
}

pub async fn deregister(instance: &str) -> anyhow::Result<()> {
    let mut client = Client::connect().await?;
    client
        .expect_ok(&Request::Deregister { instance: InstanceId::from_string(instance) })
        .await?;
    println!("deregistered {instance}");
    Ok(())
}

pub async fn enable(instance: &str) -> anyhow::Result<()> {
    let mut client = Client::connect().await?;
    client
        .expect_ok(&Request::Enable { instance: InstanceId::from_string(instance) })
        .await?;
    println!("enabled {instance}");
    Ok(())
}

pub async fn disable(instance: &str) -> anyhow::Result<()> {
    let mut client = Client::connect().await?;
    client
        .expect_ok(&Request::Disable { instance: InstanceId::from_string(instance) })
        .await?;
    println!("disabled {instance}");
    Ok(())
}
