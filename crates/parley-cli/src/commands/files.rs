use anyhow::Result;
use parley_client::Client;

pub async fn list(client: &Client) -> Result<()> {
    let listing = client.documents().list().await?;
    for (heading, names) in [
        ("uploaded", &listing.uploaded_pdfs),
        ("reports", &listing.generated_reports),
    ] {
        println!("{heading} ({}):", names.len());
        for name in names {
            println!("  {name}");
        }
    }
    Ok(())
}

/// Prints the download link of a generated report.
pub async fn download(client: &Client, filename: &str) -> Result<()> {
    let url = client.documents().report_download_url(filename).await?;
    println!("{url}");
    Ok(())
}
