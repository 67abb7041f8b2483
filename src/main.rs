#[rocket::launch]
fn rocket() -> _ {
    let rocket = mindline_api::rocket();
    log::info!("Starting Mindline API Server");
    rocket
}
