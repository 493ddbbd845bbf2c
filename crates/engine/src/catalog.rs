//! Reshaping of remote catalog data: item filtering, location flattening and
//! the transfer order payload.

use std::collections::HashMap;

use api_types::{
    item::Item,
    location::{RemoteLocation, TransferLocation},
    transfer_order::{RemoteTransferLine, RemoteTransferOrder, TransferOrderNew},
};

use crate::{EngineError, ResultEngine};

/// Unit sent on every remote transfer line; the remote accepts it for any item.
pub const PASSTHROUGH_UNIT: &str = "qty";

#[derive(Clone, Copy, Debug, Default)]
pub struct ItemFilter {
    /// Also drop items explicitly flagged as not returnable.
    pub require_returnable: bool,
}

impl ItemFilter {
    /// Whether `item` is real, sellable inventory goods.
    pub fn accepts(&self, item: &Item) -> bool {
        item.item_type.as_deref() == Some("inventory")
            && item.status.as_deref() == Some("active")
            && item.is_combo_product != Some(true)
            && item.track_inventory == Some(true)
            && item.product_type.as_deref() == Some("goods")
            && (!self.require_returnable || item.is_returnable != Some(false))
    }

    pub fn apply(&self, items: Vec<Item>) -> Vec<Item> {
        items.into_iter().filter(|item| self.accepts(item)).collect()
    }
}

fn is_active(status: Option<&str>) -> bool {
    status == Some("active")
}

/// One entry per active warehouse nested in a location; locations without
/// warehouses are transfer destinations themselves when active.
pub fn flatten_locations(locations: &[RemoteLocation]) -> Vec<TransferLocation> {
    let mut flattened = Vec::new();
    for location in locations {
        if location.warehouses.is_empty() {
            if is_active(location.status.as_deref()) {
                flattened.push(TransferLocation {
                    location_id: location.location_id.clone(),
                    location_name: location.location_name.clone(),
                    warehouse_id: None,
                    warehouse_name: None,
                    parent_location_id: None,
                    parent_location_name: None,
                    parent_location_storage_enabled: location.is_storage_location_enabled,
                    status: "active".to_string(),
                    is_primary: location.is_primary.unwrap_or(false),
                });
            } else {
                tracing::debug!(
                    location = %location.location_name,
                    "skipping inactive location"
                );
            }
            continue;
        }

        for warehouse in &location.warehouses {
            if !is_active(warehouse.status.as_deref()) {
                tracing::debug!(
                    warehouse = %warehouse.warehouse_name,
                    id = %warehouse.warehouse_id,
                    "skipping inactive warehouse"
                );
                continue;
            }
            flattened.push(TransferLocation {
                location_id: warehouse.warehouse_id.clone(),
                location_name: format!(
                    "{} ({})",
                    warehouse.warehouse_name, location.location_name
                ),
                warehouse_id: Some(warehouse.warehouse_id.clone()),
                warehouse_name: Some(warehouse.warehouse_name.clone()),
                parent_location_id: Some(location.location_id.clone()),
                parent_location_name: Some(location.location_name.clone()),
                parent_location_storage_enabled: location.is_storage_location_enabled,
                status: "active".to_string(),
                is_primary: warehouse.is_primary.unwrap_or(false),
            });
        }
    }
    flattened
}

/// Case-insensitive substring search over item name and SKU.
pub fn search_items<'a>(items: &'a [Item], term: &str) -> Vec<&'a Item> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return Vec::new();
    }
    items
        .iter()
        .filter(|item| {
            item.name.to_lowercase().contains(&term)
                || item
                    .sku
                    .as_deref()
                    .is_some_and(|sku| sku.to_lowercase().contains(&term))
        })
        .collect()
}

/// Checks done on a transfer order before anything is sent remotely.
pub fn validate_order(order: &TransferOrderNew) -> ResultEngine<()> {
    if order.from_location_id.trim().is_empty() || order.to_location_id.trim().is_empty() {
        return Err(EngineError::Validation(
            "Please select both from and to warehouses".to_string(),
        ));
    }
    if order.from_location_id == order.to_location_id {
        return Err(EngineError::Validation(
            "From and To warehouses must be different".to_string(),
        ));
    }
    if order.line_items.is_empty() {
        return Err(EngineError::Validation(
            "Please add items to the transfer order".to_string(),
        ));
    }
    if let Some(line) = order
        .line_items
        .iter()
        .find(|line| !line.quantity_transfer.is_finite() || line.quantity_transfer <= 0.0)
    {
        return Err(EngineError::Validation(format!(
            "Invalid quantity for item {}",
            line.item_id
        )));
    }
    Ok(())
}

/// Builds the remote payload, naming every line from the authoritative
/// catalog. Fails on the first line whose item is not in `names`.
pub fn remote_order(
    order: &TransferOrderNew,
    names: &HashMap<String, String>,
    today: &str,
) -> ResultEngine<RemoteTransferOrder> {
    let line_items = order
        .line_items
        .iter()
        .map(|line| {
            let name = names
                .get(&line.item_id)
                .ok_or_else(|| EngineError::UnknownItem(line.item_id.clone()))?;
            Ok(RemoteTransferLine {
                item_id: line.item_id.clone(),
                name: name.clone(),
                quantity_transfer: line.quantity_transfer,
                unit: PASSTHROUGH_UNIT.to_string(),
                description: line.description.clone().filter(|d| !d.is_empty()),
            })
        })
        .collect::<ResultEngine<Vec<_>>>()?;

    Ok(RemoteTransferOrder {
        from_warehouse_id: order.from_location_id.clone(),
        to_warehouse_id: order.to_location_id.clone(),
        date: order
            .date
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| today.to_string()),
        line_items,
    })
}

#[cfg(test)]
mod tests {
    use api_types::{location::RemoteWarehouse, transfer_order::TransferLineNew};

    use super::*;

    fn goods(id: &str) -> Item {
        Item {
            item_id: id.to_string(),
            name: format!("Item {id}"),
            item_type: Some("inventory".to_string()),
            status: Some("active".to_string()),
            product_type: Some("goods".to_string()),
            is_combo_product: Some(false),
            track_inventory: Some(true),
            ..Default::default()
        }
    }

    #[test]
    fn filter_keeps_only_tracked_active_goods() {
        let mut service = goods("2");
        service.product_type = Some("service".to_string());
        let mut inactive = goods("3");
        inactive.status = Some("inactive".to_string());
        let mut combo = goods("4");
        combo.is_combo_product = Some(true);
        let mut untracked = goods("5");
        untracked.track_inventory = None;
        let mut sales = goods("6");
        sales.item_type = Some("sales".to_string());

        let kept = ItemFilter::default().apply(vec![
            goods("1"),
            service,
            inactive,
            combo,
            untracked,
            sales,
        ]);
        let ids: Vec<_> = kept.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, vec!["1"]);
    }

    #[test]
    fn returnable_flag_is_only_checked_on_request() {
        let mut item = goods("1");
        item.is_returnable = Some(false);

        assert!(ItemFilter::default().accepts(&item));
        assert!(
            !ItemFilter {
                require_returnable: true
            }
            .accepts(&item)
        );
    }

    #[test]
    fn nested_warehouses_are_flattened() {
        let locations = vec![
            RemoteLocation {
                location_id: "L1".to_string(),
                location_name: "Riyadh".to_string(),
                status: Some("active".to_string()),
                is_storage_location_enabled: Some(true),
                warehouses: vec![
                    RemoteWarehouse {
                        warehouse_id: "W1".to_string(),
                        warehouse_name: "Main".to_string(),
                        status: Some("active".to_string()),
                        is_primary: Some(true),
                    },
                    RemoteWarehouse {
                        warehouse_id: "W2".to_string(),
                        warehouse_name: "Old".to_string(),
                        status: Some("inactive".to_string()),
                        is_primary: None,
                    },
                ],
                ..Default::default()
            },
            RemoteLocation {
                location_id: "L2".to_string(),
                location_name: "Jeddah".to_string(),
                status: Some("active".to_string()),
                ..Default::default()
            },
            RemoteLocation {
                location_id: "L3".to_string(),
                location_name: "Closed".to_string(),
                status: Some("inactive".to_string()),
                ..Default::default()
            },
        ];

        let flat = flatten_locations(&locations);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[0].location_id, "W1");
        assert_eq!(flat[0].location_name, "Main (Riyadh)");
        assert_eq!(flat[0].parent_location_id.as_deref(), Some("L1"));
        assert!(flat[0].is_primary);
        assert_eq!(flat[1].location_id, "L2");
        assert_eq!(flat[1].parent_location_id, None);
    }

    #[test]
    fn search_matches_name_or_sku() {
        let mut tea = goods("1");
        tea.name = "Green Tea".to_string();
        let mut cup = goods("2");
        cup.name = "Cup".to_string();
        cup.sku = Some("TEA-CUP".to_string());
        let items = vec![tea, cup, goods("3")];

        assert_eq!(search_items(&items, "tea").len(), 2);
        assert_eq!(search_items(&items, "  ").len(), 0);
        assert_eq!(search_items(&items, "cup")[0].item_id, "2");
    }

    #[test]
    fn remote_order_names_lines_and_defaults_date() {
        let order = TransferOrderNew {
            from_location_id: "W1".to_string(),
            to_location_id: "W2".to_string(),
            date: None,
            line_items: vec![TransferLineNew {
                item_id: "1".to_string(),
                quantity_transfer: 2.0,
                description: Some(String::new()),
            }],
        };
        let names = HashMap::from([("1".to_string(), "Green Tea".to_string())]);

        let remote = remote_order(&order, &names, "2026-01-31").unwrap();
        assert_eq!(remote.date, "2026-01-31");
        assert_eq!(remote.line_items[0].name, "Green Tea");
        assert_eq!(remote.line_items[0].unit, PASSTHROUGH_UNIT);
        assert_eq!(remote.line_items[0].description, None);

        let err = remote_order(&order, &HashMap::new(), "2026-01-31").unwrap_err();
        assert_eq!(err, EngineError::UnknownItem("1".to_string()));
    }
}
