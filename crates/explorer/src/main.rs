use color_eyre::eyre;
use structopt::StructOpt;
use tracing::info;

use explorer::{client, explore, logger};
use exchanges::{Exchange, PrivateExchange, PublicExchange};
use interface::{ExchangeId, Page, Timeframe};

// .env 는 lib.rs 의 ctor 에서 로드됨

#[derive(Debug, StructOpt)]
#[structopt(name = "explorer", about = "거래소 REST API 조회 도구")]
struct Opt {
    /// bittrex, btcalpha, latoken, bitopro, whitebit
    #[structopt(short, long)]
    exchange: ExchangeId,

    /// 로그 파일 디렉터리
    #[structopt(long, default_value = "logs")]
    log_dir: String,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// 마켓 목록
    Markets,
    /// 통화 목록
    Currencies,
    /// 단일 티커
    Ticker { symbol: String },
    /// 호가
    OrderBook {
        symbol: String,
        #[structopt(short, long)]
        limit: Option<usize>,
    },
    /// 최근 체결
    Trades {
        symbol: String,
        #[structopt(short, long)]
        limit: Option<usize>,
    },
    /// 캔들
    Ohlcv {
        symbol: String,
        #[structopt(short, long, default_value = "1h")]
        timeframe: Timeframe,
        /// 시작 시각 (epoch ms)
        #[structopt(long)]
        since: Option<i64>,
        #[structopt(short, long)]
        limit: Option<usize>,
    },
    /// 서버 시각
    Time,
    /// 잔고 (API 키 필요)
    Balance,
    /// 미체결 주문 (API 키 필요)
    OpenOrders { symbol: Option<String> },
}

fn page(since: Option<i64>, limit: Option<usize>) -> Page {
    Page { since, limit }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();
    let _guards = logger::init_tracing(&opt.log_dir)?;

    let exchange = client(opt.exchange)?;
    info!("{} ({}) 조회 시작", exchange.describe().name, opt.exchange);

    match opt.cmd {
        Command::Markets => {
            let markets = exchange.load_markets(false).await?;
            explore::print_markets(&markets);
        }
        Command::Currencies => {
            let currencies = exchange.fetch_currencies().await?;
            explore::print_currencies(&currencies);
        }
        Command::Ticker { symbol } => {
            let ticker = exchange.fetch_ticker(&symbol).await?;
            explore::print_ticker(&ticker);
        }
        Command::OrderBook { symbol, limit } => {
            let book = exchange.fetch_order_book(&symbol, limit).await?;
            explore::print_order_book(&book, limit.unwrap_or(10));
        }
        Command::Trades { symbol, limit } => {
            let trades = exchange.fetch_trades(&symbol, page(None, limit)).await?;
            explore::print_trades(&trades);
        }
        Command::Ohlcv {
            symbol,
            timeframe,
            since,
            limit,
        } => {
            let candles = exchange
                .fetch_ohlcv(&symbol, timeframe, page(since, limit))
                .await?;
            explore::print_ohlcv(&candles);
        }
        Command::Time => {
            let time = exchange.fetch_time().await?;
            info!("server time: {} ({})", time, interface::time::iso8601(time).unwrap_or_default());
        }
        Command::Balance => {
            let balances = exchange.fetch_balance().await?;
            explore::print_balances(&balances);
        }
        Command::OpenOrders { symbol } => {
            let orders = exchange
                .fetch_open_orders(symbol.as_deref(), Page::new())
                .await?;
            explore::print_orders(&orders);
        }
    }

    info!("완료!");
    Ok(())
}
