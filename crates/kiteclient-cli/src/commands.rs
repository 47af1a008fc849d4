use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Value};

use kiteclient_core::models::{
    Exchange, MarginSegment, ModifyOrderParams, OrderType, PlaceOrderParams, Product,
    TransactionType, Validity, Variety,
};
use kiteclient_core::KiteClient;

#[derive(Debug, Clone)]
pub enum Command {
    Login { save: bool },
    Logout { forget: bool },
    Profile,
    Margins(Option<MarginSegment>),
    Orders,
    Positions,
    History(String),
    Quote(Vec<String>),
    Ltp(Vec<String>),
    Place(PlaceOrderParams),
    Modify(ModifyOrderParams),
    Cancel {
        variety: Variety,
        order_id: String,
        parent_order_id: Option<String>,
    },
    Snapshot,
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("Missing argument: {}", name))
}

fn parse<T>(args: &[String], index: usize, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = arg(args, index, name)?;
    raw.parse().with_context(|| format!("Invalid {}: {}", name, raw))
}

/// Split trailing `key=value` arguments.
fn options(args: &[String]) -> Result<Vec<(&str, &str)>> {
    args.iter()
        .map(|a| {
            a.split_once('=')
                .ok_or_else(|| anyhow!("Expected key=value, got: {}", a))
        })
        .collect()
}

fn value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.parse().with_context(|| format!("Invalid {}: {}", key, raw))
}

impl Command {
    pub fn parse(args: &[String]) -> Result<Self> {
        let name = arg(args, 0, "command")?;
        let rest = &args[1..];
        let flag = |f: &str| rest.iter().any(|a| a == f);

        let command = match name {
            "login" => Command::Login { save: flag("--save") },
            "logout" => Command::Logout {
                forget: flag("--forget"),
            },
            "profile" => Command::Profile,
            "margins" => Command::Margins(match rest.first() {
                Some(segment) => Some(value("segment", segment)?),
                None => None,
            }),
            "orders" => Command::Orders,
            "positions" => Command::Positions,
            "history" => Command::History(arg(rest, 0, "order_id")?.to_string()),
            "quote" | "ltp" => {
                if rest.is_empty() {
                    bail!("At least one instrument is required, e.g. NSE:INFY");
                }
                if name == "quote" {
                    Command::Quote(rest.to_vec())
                } else {
                    Command::Ltp(rest.to_vec())
                }
            }
            "place" => Command::Place(Self::parse_place(rest)?),
            "modify" => Command::Modify(Self::parse_modify(rest)?),
            "cancel" => Command::Cancel {
                variety: parse(rest, 0, "variety")?,
                order_id: arg(rest, 1, "order_id")?.to_string(),
                parent_order_id: rest.get(2).cloned(),
            },
            "snapshot" => Command::Snapshot,
            other => bail!("Unknown command: {} (see kite --help)", other),
        };
        Ok(command)
    }

    fn parse_place(args: &[String]) -> Result<PlaceOrderParams> {
        let mut params = PlaceOrderParams::new(
            parse::<Variety>(args, 0, "variety")?,
            parse::<Exchange>(args, 1, "exchange")?,
            arg(args, 2, "tradingsymbol")?,
            parse::<TransactionType>(args, 3, "transaction type")?,
            parse::<u32>(args, 4, "quantity")?,
            parse::<Product>(args, 5, "product")?,
            parse::<OrderType>(args, 6, "order type")?,
        );

        for (key, raw) in options(args.get(7..).unwrap_or_default())? {
            params = match key {
                "price" => params.price(value(key, raw)?),
                "validity" => params.validity(value::<Validity>(key, raw)?),
                "disclosed_quantity" => params.disclosed_quantity(value(key, raw)?),
                "trigger_price" => params.trigger_price(value(key, raw)?),
                "squareoff" => params.squareoff(value(key, raw)?),
                "stoploss" => params.stoploss(value(key, raw)?),
                "trailing_stoploss" => params.trailing_stoploss(value(key, raw)?),
                "tag" => params.tag(raw),
                other => bail!("Unknown order field: {}", other),
            };
        }
        Ok(params)
    }

    fn parse_modify(args: &[String]) -> Result<ModifyOrderParams> {
        let mut params = ModifyOrderParams::new(
            parse::<Variety>(args, 0, "variety")?,
            arg(args, 1, "order_id")?,
        );

        for (key, raw) in options(args.get(2..).unwrap_or_default())? {
            params = match key {
                "parent_order_id" => params.parent_order_id(raw),
                "quantity" => params.quantity(value(key, raw)?),
                "price" => params.price(value(key, raw)?),
                "order_type" => params.order_type(value::<OrderType>(key, raw)?),
                "trigger_price" => params.trigger_price(value(key, raw)?),
                "validity" => params.validity(value::<Validity>(key, raw)?),
                "disclosed_quantity" => params.disclosed_quantity(value(key, raw)?),
                other => bail!("Unknown order field: {}", other),
            };
        }
        Ok(params)
    }

    /// Run the command against the API. Errors keep their `ApiError` so the
    /// caller can detect an expired session.
    pub async fn execute(&self, client: &KiteClient) -> Result<Value> {
        let output = match self {
            Command::Login { .. } | Command::Logout { .. } => {
                bail!("{:?} does not call the API", self)
            }
            Command::Profile => serde_json::to_value(client.profile().await?)?,
            Command::Margins(None) => serde_json::to_value(client.margins().await?)?,
            Command::Margins(Some(segment)) => {
                serde_json::to_value(client.segment_margins(*segment).await?)?
            }
            Command::Orders => serde_json::to_value(client.orders().await?)?,
            Command::Positions => serde_json::to_value(client.positions().await?)?,
            Command::History(order_id) => {
                serde_json::to_value(client.order_history(order_id).await?)?
            }
            Command::Quote(instruments) => serde_json::to_value(client.quote(instruments).await?)?,
            Command::Ltp(instruments) => serde_json::to_value(client.ltp(instruments).await?)?,
            Command::Place(params) => json!({ "order_id": client.place_order(params).await? }),
            Command::Modify(params) => json!({ "order_id": client.modify_order(params).await? }),
            Command::Cancel {
                variety,
                order_id,
                parent_order_id,
            } => {
                let cancelled = client
                    .cancel_order(*variety, order_id, parent_order_id.as_deref())
                    .await?;
                json!({ "order_id": cancelled })
            }
            Command::Snapshot => {
                let (profile, margins, positions) = futures::try_join!(
                    client.profile(),
                    client.margins(),
                    client.positions()
                )?;
                json!({
                    "profile": profile,
                    "margins": margins,
                    "positions": positions,
                })
            }
        };
        Ok(output)
    }
}
