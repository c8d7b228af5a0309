use std::sync::Arc;
use switchyard::{base_path, params, query, AsyncHook, Request, RouterBuilder, Server, StatusCode};
use tracing_subscriber::EnvFilter;

async fn handler(req: Request) -> anyhow::Result<String> {
	let params = params(&req).unwrap_or_default();
	Ok(format!("{:?} via {:?}", params, base_path(&req)))
}

async fn greet(req: Request) -> anyhow::Result<String> {
	let name = query(&req).get("name").unwrap_or("stranger").to_owned();
	Ok(format!("Hello {}", name))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("switchyard=debug")))
		.init();

	let addr = ([127, 0, 0, 1], 3000).into();

	let user_agent = Arc::new(AsyncHook::new(|req: Request| async move {
		req.headers()
			.get("user-agent")
			.and_then(|v| v.to_str().ok())
			.unwrap_or("unknown")
			.to_owned()
	}));

	let mut api = RouterBuilder::default();
	api.get("/users/:id", handler)
		.post("/foo/:a/bar/:b/baz", handler)
		.get("/agent", move |req: Request| {
			let user_agent = Arc::clone(&user_agent);
			async move { anyhow::Ok((*user_agent.get(&req).await).clone()) }
		});

	let mut app = RouterBuilder::default();
	app.middleware(|req, next| async move {
		if req.headers().contains_key("x-deny") {
			return next.fail(anyhow::anyhow!("request denied"));
		}
		next.run().await
	})
	.get("/", greet)
	.get("/teapot", |_req| async { anyhow::Ok((StatusCode::IM_A_TEAPOT, "short and stout")) })
	.mount("/api", api);

	let server = Server::bind(&addr).serve(app.build()?);
	println!("Listening on http://{}", addr);

	server.await?;
	Ok(())
}
