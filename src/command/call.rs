use super::Session;
use crate::args;
use host::marshal::parse_cli_param;

impl args::Call {
    pub(crate) async fn run(self) -> Result<(), anyhow::Error> {
        let session = Session::open(self.common).await?;
        let params: Vec<_> = self.params.iter().map(|p| parse_cli_param(p)).collect();
        let mut instance = session.component.instantiate().await?;
        let value = instance.call_json(self.entry_point, &params).await?;
        println!("{value}");
        Ok(())
    }
}
