use conduit::{
    ConduitConfig, DisplayBuilder, Flow, InMemorySessionStore, LoggingCompletionSink, RawRequest,
    RequestHandler, Response, Router, State, Transition, validator,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// A dial-in banking menu with two flows:
// 1. main_menu - balance check, hand-off to transfers, exit
// 2. transfer - recipient, amount and confirmation screens
fn main_menu() -> anyhow::Result<Flow> {
    let menu = DisplayBuilder::new()
        .header(["Welcome to Demo Bank"])
        .menu(|m| {
            m.option(1, "Check balance")
                .option(2, "Send money")
                .exit_option("Exit")
        })
        .build();

    let flow = Flow::builder("main_menu")
        .state(
            State::builder("menu")
                .display(menu)
                .on("1", Transition::to("balance"))
                .on(
                    "2",
                    Transition::action(|_, _| {
                        Ok(Some(Response::transition_to(
                            "Send money\nPress any key to continue",
                            "transfer",
                        )))
                    }),
                )
                .on(
                    "000",
                    Transition::action(|_, _| Ok(Some(Response::end("Goodbye")))),
                )
                .build(),
        )
        .state(
            State::builder("balance")
                .render(|session| {
                    let balance = session.get::<u64>("balance").unwrap_or(1_250);
                    Ok(DisplayBuilder::new()
                        .text(format!("Your balance is KES {balance}"))
                        .blank_line()
                        .menu(|m| m.back_option("Back").home_option("Home"))
                        .build())
                })
                .build(),
        )
        .build()?;
    Ok(flow)
}

fn transfer() -> anyhow::Result<Flow> {
    let flow = Flow::builder("transfer")
        .state(
            State::builder("recipient")
                .display("Enter recipient phone number:")
                .validate(validator::numeric())
                .validate(validator::min_length(9))
                .validate(validator::max_length(12))
                .on_valid(|input, session| {
                    session.set("recipient", input)?;
                    Ok(None)
                })
                .on_any(Transition::to("amount"))
                .build(),
        )
        .state(
            State::builder("amount")
                .display("Enter amount:")
                .validate(validator::numeric())
                .validate(validator::in_range(10, 70_000))
                .on_valid(|input, session| {
                    session.set("amount", input)?;
                    Ok(None)
                })
                .on_any(Transition::to("confirm"))
                .build(),
        )
        .state(
            State::builder("confirm")
                .render(|session| {
                    let recipient = session.get_str("recipient").unwrap_or_default();
                    let amount = session.get_str("amount").unwrap_or_default();
                    Ok(DisplayBuilder::new()
                        .text(format!("Send KES {amount} to {recipient}?"))
                        .menu(|m| m.option(1, "Confirm").back_option("Back"))
                        .build())
                })
                .on(
                    "1",
                    Transition::action(|_, session| {
                        let amount = session.get_str("amount").unwrap_or_default().to_string();
                        Ok(Some(Response::end(format!("KES {amount} sent. Thank you."))))
                    }),
                )
                .build(),
        )
        .build()?;
    Ok(flow)
}

fn request(session_id: &str, text: &str) -> RawRequest {
    [
        ("sessionId", session_id),
        ("phoneNumber", "+254712345678"),
        ("serviceCode", "*384*1#"),
        ("networkCode", "63902"),
        ("text", text),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let router = Router::builder()
        .register(main_menu()?)
        .register(transfer()?)
        .route("*384*1#", "main_menu")
        .build()?;

    let config = ConduitConfig::from_env()?;
    let handler = RequestHandler::builder(router, Arc::new(InMemorySessionStore::new()))
        .config(config)
        .completion_sink(Arc::new(LoggingCompletionSink))
        .build();

    // Cumulative input strings as a gateway would send them
    let script = [
        "",
        "1",
        "1*0",
        "1*0*2",
        "1*0*2*x",
        "1*0*2*x*0712345678",
        "1*0*2*x*0712345678*5",
        "1*0*2*x*0712345678*5*500",
        "1*0*2*x*0712345678*5*500*1",
    ];

    for text in script {
        let reply = handler.process(&request("demo-session", text)).await;
        info!(input = %text, "Dialled");
        println!("> {text:?}\n{reply}\n");
    }

    Ok(())
}

fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "banking=info,conduit=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_level(true),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }
}
