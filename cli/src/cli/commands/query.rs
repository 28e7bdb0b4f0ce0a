use snc_core::config::Config;

use crate::cli::{connect, QueryArgs};

pub async fn run(config: &Config, args: QueryArgs) -> anyhow::Result<()> {
    let client = connect(config)?;

    let mut gr = client.glide_record(&args.table);
    gr.set_display_mode(config.display_mode()?);
    gr.set_rewindable(false);
    if let Some(query) = &args.query {
        gr.add_encoded_query(query);
    }
    if let Some(fields) = &args.fields {
        gr.set_fields(fields);
    }
    if let Some(limit) = args.limit {
        gr.set_limit(limit);
    }
    if let Some(order) = &args.order {
        if args.desc {
            gr.order_by_desc(order);
        } else {
            gr.order_by(order);
        }
    }

    gr.query().await?;
    let mode = args.display.into();
    let mut printed = 0;
    while gr.next().await? {
        if let Some(row) = gr.serialize(mode, None, false) {
            println!("{}", serde_json::to_string(&row)?);
            printed += 1;
        }
    }
    tracing::info!("{} of {} row(s) from {}", printed, gr.get_row_count(), args.table);
    Ok(())
}
