/// Prints every pending and active job as a table.
///
/// # Errors
///
/// Returns an error if the database query fails.
pub(crate) async fn run_jobs(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let jobs = pricedrop_db::list_open_jobs(pool).await?;

    if jobs.is_empty() {
        println!("no pending or active jobs");
        return Ok(());
    }

    println!(
        "{:>8}  {:<9}{:>9}  {:<18}{:<18}VARIANT",
        "ID", "STATUS", "PERCENT", "START", "END"
    );
    for job in &jobs {
        println!(
            "{:>8}  {:<9}{:>9}  {:<18}{:<18}{}",
            job.id,
            job.status.as_str(),
            job.discount_percent.normalize().to_string(),
            job.start_time.format("%Y-%m-%d %H:%M").to_string(),
            job.end_time.format("%Y-%m-%d %H:%M").to_string(),
            job.variant_id
        );
        if let Some(error) = &job.last_error {
            println!("{:>10}last error: {error}", "");
        }
    }

    Ok(())
}
