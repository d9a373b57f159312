#[tokio::main]
async fn main() -> anyhow::Result<()> {
    book_catalog_lib::run().await
}
